use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, RawObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::MAX_EXTERNAL_BASES;
use crate::artifacts::pack::reader::PackFile;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::cell::OnceCell;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Object database of a repository
///
/// Reads loose objects first and falls back to the pack files under
/// `objects/pack`, which are indexed lazily on the first miss.
#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: OnceCell<Vec<PackFile>>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database {
            path,
            packs: OnceCell::new(),
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Load an object, loose or packed
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<RawObject> {
        self.load_with_depth(object_id, 0)
    }

    /// `depth` counts the ref-delta bases already fetched from outside the pack that needed them
    fn load_with_depth(&self, object_id: &ObjectId, depth: usize) -> anyhow::Result<RawObject> {
        if depth > MAX_EXTERNAL_BASES {
            anyhow::bail!(
                "Delta base {} crosses more than {} packs",
                object_id,
                MAX_EXTERNAL_BASES
            );
        }

        let object_path = self.path.join(object_id.to_path());
        if object_path.exists() {
            return self.read_object(object_path);
        }

        for pack in self.packs()? {
            let object =
                pack.read_object(object_id, |base| self.load_with_depth(base, depth + 1))?;
            if let Some(object) = object {
                return Ok(object);
            }
        }

        anyhow::bail!("Object {} not found in {}", object_id, self.path.display())
    }

    pub fn contains(&self, object_id: &ObjectId) -> anyhow::Result<bool> {
        if self.path.join(object_id.to_path()).exists() {
            return Ok(true);
        }

        Ok(self
            .packs()?
            .iter()
            .any(|pack| pack.index().contains(object_id)))
    }

    pub fn store(&self, object: impl Object) -> anyhow::Result<ObjectId> {
        let object_id = object.object_id()?;
        let object_path = self.path.join(object_id.to_path());
        let object_content = object.serialize()?;

        // write the object to disk unless it already exists
        // otherwise, create the object directory
        if !object_path.exists() {
            std::fs::create_dir_all(
                object_path
                    .parent()
                    .context(format!("Invalid object path {}", object_path.display()))?,
            )
            .context(format!(
                "Unable to create object directory {}",
                object_path.display()
            ))?;

            self.write_object(object_path, object_content)?;
        }

        Ok(object_id)
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let object = self.load(object_id)?;

        match object.kind() {
            ObjectType::Commit => Ok(Some(Commit::deserialize(Cursor::new(
                object.into_content(),
            ))?)),
            _ => Ok(None),
        }
    }

    /// Load a commit, failing when the object is missing or of another type
    pub fn load_commit(&self, object_id: &ObjectId) -> anyhow::Result<Commit> {
        self.parse_object_as_commit(object_id)?
            .with_context(|| format!("Object {} is not a commit", object_id))
    }

    pub fn load_slim_commit(&self, object_id: &ObjectId) -> anyhow::Result<SlimCommit> {
        Ok(self.load_commit(object_id)?.to_slim(object_id.clone()))
    }

    fn packs(&self) -> anyhow::Result<&[PackFile]> {
        if let Some(packs) = self.packs.get() {
            return Ok(packs.as_slice());
        }

        let packs = self.open_packs()?;
        Ok(self.packs.get_or_init(|| packs).as_slice())
    }

    fn open_packs(&self) -> anyhow::Result<Vec<PackFile>> {
        let pack_dir = self.path.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut index_paths = std::fs::read_dir(&pack_dir)
            .with_context(|| format!("Unable to list pack directory {}", pack_dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "idx"))
            .collect::<Vec<_>>();
        index_paths.sort();

        index_paths
            .iter()
            .map(|index_path| PackFile::open(index_path))
            .collect()
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<RawObject> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        let object_content = Self::decompress(object_content.into())?;
        let mut object_reader = Cursor::new(object_content);
        let (object_type, size) = ObjectType::parse_object_header(&mut object_reader)?;

        let start = object_reader.position() as usize;
        let content = object_reader.into_inner().slice(start..);
        if content.len() != size {
            anyhow::bail!(
                "Object file {} declares {} bytes but holds {}",
                object_path.display(),
                size,
                content.len()
            );
        }

        Ok(RawObject::new(object_type, content))
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}
