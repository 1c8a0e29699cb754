use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Serialization into the loose object format `<type> <size>\0<content>`
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Deserialization from an object's content (header already consumed)
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn display(&self) -> String;

    fn object_id(&self) -> Result<ObjectId> {
        let content = self.serialize()?;
        let mut hasher = Sha1::new();
        hasher.update(&content);

        let oid = hasher.finalize();
        ObjectId::try_parse(format!("{oid:x}"))
    }

    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}

/// An object whose content is kept as opaque bytes
///
/// This is what the database hands back before the content is parsed into a
/// concrete type, and what gets stored for objects the auditor never needs to
/// interpret (trees, blobs).
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct RawObject {
    object_type: ObjectType,
    content: Bytes,
}

impl RawObject {
    pub fn kind(&self) -> ObjectType {
        self.object_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}

impl Packable for RawObject {
    fn serialize(&self) -> Result<Bytes> {
        let mut object_bytes = Vec::with_capacity(self.content.len() + 16);
        let header = format!("{} {}\0", self.object_type.as_str(), self.content.len());
        object_bytes.write_all(header.as_bytes())?;
        object_bytes.write_all(&self.content)?;

        Ok(Bytes::from(object_bytes))
    }
}

impl Object for RawObject {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.content).to_string()
    }
}
