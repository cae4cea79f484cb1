use crate::config::IndexConfig;
use crate::error::RecommendError;
use crate::index::Index;
use crate::item::{Corpus, Item, ItemRecord};
use crate::vectorize::{FeatureVector, FittedModel};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_items: usize,
    pub vocab_size: u32,
    pub created_at: String,
    pub version: u32,
    pub config: IndexConfig,
    /// Fingerprint of the corpus every other part was built from.
    #[serde(default)]
    pub corpus_fingerprint: String,
}

/// On-disk form of `vectors.bin`: the vectors tagged with the corpus they encode.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorsFile {
    pub corpus_fingerprint: String,
    pub vectors: Vec<FeatureVector>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn items(&self) -> PathBuf { self.root.join("items.bin") }
    fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn vectors(&self) -> PathBuf { self.root.join("vectors.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Read a corpus file: a JSON array of item records.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Item>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("opening corpus {}", path.display()))?;
    let records: Vec<ItemRecord> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing corpus {}", path.display()))?;
    Ok(records.into_iter().map(Item::from).collect())
}

/// Write `bytes` next to `path` and rename into place, so a reader sees either
/// the old file or the complete new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {} into place", tmp.display()))?;
    Ok(())
}

fn save_bin<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    write_atomic(&path, &bytes)
}

fn load_bin<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    let mut f = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

pub fn save_items(paths: &IndexPaths, items: &[Item]) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(paths.items(), items)
}

pub fn load_items(paths: &IndexPaths) -> Result<Vec<Item>> {
    load_bin(paths.items())
}

pub fn save_model(paths: &IndexPaths, model: &FittedModel) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(paths.model(), model)
}

pub fn load_model(paths: &IndexPaths) -> Result<FittedModel> {
    load_bin(paths.model())
}

pub fn save_vectors(paths: &IndexPaths, corpus_fingerprint: &str, vectors: &[FeatureVector]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let file = VectorsFile { corpus_fingerprint: corpus_fingerprint.to_string(), vectors: vectors.to_vec() };
    save_bin(paths.vectors(), &file)
}

pub fn load_vectors(paths: &IndexPaths) -> Result<VectorsFile> {
    load_bin(paths.vectors())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write every part of a built index under `paths.root`. Each part is replaced
/// atomically and `meta.json` goes last.
pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<()> {
    save_items(paths, index.corpus().items())?;
    save_model(paths, index.model())?;
    save_vectors(paths, index.fingerprint(), index.similarity_index().vectors())?;
    let meta = MetaFile {
        num_items: index.len(),
        vocab_size: index.model().dim(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        config: index.config().clone(),
        corpus_fingerprint: index.fingerprint().to_string(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_items = meta.num_items, fingerprint = %meta.corpus_fingerprint, "index saved");
    Ok(())
}

fn mismatch(what: &str, expected: &str, found: &str) -> anyhow::Error {
    RecommendError::CorpusMismatch(format!("{what} was written for corpus {expected}, items hash to {found}")).into()
}

/// Read an index written by [`save_index`]; the similarity structure is rebuilt
/// with the stored strategy. Parts from different builds fail with
/// [`RecommendError::CorpusMismatch`].
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let meta = load_meta(paths)?;
    anyhow::ensure!(
        meta.version == FORMAT_VERSION,
        "index format version {} is not supported (expected {FORMAT_VERSION})",
        meta.version
    );
    let corpus = Corpus::new(load_items(paths)?)?;
    let model = load_model(paths)?;
    let vectors = load_vectors(paths)?;

    if meta.num_items != corpus.len() || meta.vocab_size != model.dim() {
        return Err(RecommendError::CorpusMismatch(format!(
            "meta.json describes {} items / {} terms but found {} items / {} terms",
            meta.num_items,
            meta.vocab_size,
            corpus.len(),
            model.dim()
        ))
        .into());
    }
    if meta.corpus_fingerprint != corpus.fingerprint() {
        return Err(mismatch("meta.json", &meta.corpus_fingerprint, corpus.fingerprint()));
    }
    if vectors.corpus_fingerprint != corpus.fingerprint() {
        return Err(mismatch("vectors.bin", &vectors.corpus_fingerprint, corpus.fingerprint()));
    }
    // The model's own fingerprint is checked while assembling.
    let index = Index::from_parts(meta.config, corpus, model, vectors.vectors)?;
    tracing::info!(root = %paths.root.display(), num_items = index.len(), created_at = %meta.created_at, "index loaded");
    Ok(index)
}
