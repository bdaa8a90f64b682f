//! Registro de tipos de artifact y de atributo.
//!
//! Los tipos built-in tienen ids fijos (coinciden con los valores que usan
//! las herramientas externas que leen la base). Los tipos agregados en
//! runtime reciben el siguiente id libre por encima del máximo registrado.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Descriptor de un tipo (artifact o atributo).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: i32,
    pub name: String,
    pub display_name: String,
}

/// Tipos de artifact built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ArtifactType {
    GenInfo = 1,
    WebBookmark = 2,
    WebCookie = 3,
    WebHistory = 4,
    WebDownload = 5,
    RecentObject = 6,
    Trackpoint = 7,
    InstalledProg = 8,
    KeywordHit = 9,
    HashsetHit = 10,
    DeviceAttached = 11,
    InterestingFileHit = 12,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 12] = [
        Self::GenInfo,
        Self::WebBookmark,
        Self::WebCookie,
        Self::WebHistory,
        Self::WebDownload,
        Self::RecentObject,
        Self::Trackpoint,
        Self::InstalledProg,
        Self::KeywordHit,
        Self::HashsetHit,
        Self::DeviceAttached,
        Self::InterestingFileHit,
    ];

    pub fn id(self) -> i32 { self as i32 }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::GenInfo => "TSK_GEN_INFO",
            Self::WebBookmark => "TSK_WEB_BOOKMARK",
            Self::WebCookie => "TSK_WEB_COOKIE",
            Self::WebHistory => "TSK_WEB_HISTORY",
            Self::WebDownload => "TSK_WEB_DOWNLOAD",
            Self::RecentObject => "TSK_RECENT_OBJECT",
            Self::Trackpoint => "TSK_TRACKPOINT",
            Self::InstalledProg => "TSK_INSTALLED_PROG",
            Self::KeywordHit => "TSK_KEYWORD_HIT",
            Self::HashsetHit => "TSK_HASHSET_HIT",
            Self::DeviceAttached => "TSK_DEVICE_ATTACHED",
            Self::InterestingFileHit => "TSK_INTERESTING_FILE_HIT",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::GenInfo => "General Info",
            Self::WebBookmark => "Bookmarks",
            Self::WebCookie => "Cookies",
            Self::WebHistory => "History",
            Self::WebDownload => "Downloads",
            Self::RecentObject => "Recent Documents",
            Self::Trackpoint => "GPS Trackpoints",
            Self::InstalledProg => "Installed Programs",
            Self::KeywordHit => "Keyword Hits",
            Self::HashsetHit => "Hashset Hits",
            Self::DeviceAttached => "Devices Attached",
            Self::InterestingFileHit => "Interesting Files",
        }
    }

    pub fn from_id(id: i32) -> Option<Self> { Self::ALL.into_iter().find(|t| t.id() == id) }
}

/// Tipos de atributo built-in. El id 5 no se usa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum AttributeType {
    Url = 1,
    Datetime = 2,
    Name = 3,
    ProgName = 4,
    Value = 6,
    Flag = 7,
    Path = 8,
    Geo = 9,
    Keyword = 10,
    KeywordRegexp = 11,
    KeywordPreview = 12,
    KeywordSet = 13,
    Username = 14,
    Domain = 15,
    Password = 16,
    NamePerson = 17,
    DeviceModel = 18,
    DeviceMake = 19,
    DeviceId = 20,
    Email = 21,
    HashMd5 = 22,
    HashSha1 = 23,
    HashSha2_256 = 24,
    HashSha2_512 = 25,
    Text = 26,
    TextFile = 27,
    TextLanguage = 28,
    Entropy = 29,
    HashsetName = 30,
    InterestingFile = 31,
    Referrer = 32,
    LastAccessed = 33,
    IpAddress = 34,
    PhoneNumber = 35,
    PathId = 36,
    SetName = 37,
    EncryptionDetected = 38,
    MalwareDetected = 39,
    StegDetected = 40,
}

impl AttributeType {
    pub const ALL: [AttributeType; 39] = [
        Self::Url,
        Self::Datetime,
        Self::Name,
        Self::ProgName,
        Self::Value,
        Self::Flag,
        Self::Path,
        Self::Geo,
        Self::Keyword,
        Self::KeywordRegexp,
        Self::KeywordPreview,
        Self::KeywordSet,
        Self::Username,
        Self::Domain,
        Self::Password,
        Self::NamePerson,
        Self::DeviceModel,
        Self::DeviceMake,
        Self::DeviceId,
        Self::Email,
        Self::HashMd5,
        Self::HashSha1,
        Self::HashSha2_256,
        Self::HashSha2_512,
        Self::Text,
        Self::TextFile,
        Self::TextLanguage,
        Self::Entropy,
        Self::HashsetName,
        Self::InterestingFile,
        Self::Referrer,
        Self::LastAccessed,
        Self::IpAddress,
        Self::PhoneNumber,
        Self::PathId,
        Self::SetName,
        Self::EncryptionDetected,
        Self::MalwareDetected,
        Self::StegDetected,
    ];

    pub fn id(self) -> i32 { self as i32 }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Url => "TSK_URL",
            Self::Datetime => "TSK_DATETIME",
            Self::Name => "TSK_NAME",
            Self::ProgName => "TSK_PROG_NAME",
            Self::Value => "TSK_VALUE",
            Self::Flag => "TSK_FLAG",
            Self::Path => "TSK_PATH",
            Self::Geo => "TSK_GEO",
            Self::Keyword => "TSK_KEYWORD",
            Self::KeywordRegexp => "TSK_KEYWORD_REGEXP",
            Self::KeywordPreview => "TSK_KEYWORD_PREVIEW",
            Self::KeywordSet => "TSK_KEYWORD_SET",
            Self::Username => "TSK_USERNAME",
            Self::Domain => "TSK_DOMAIN",
            Self::Password => "TSK_PASSWORD",
            Self::NamePerson => "TSK_NAME_PERSON",
            Self::DeviceModel => "TSK_DEVICE_MODEL",
            Self::DeviceMake => "TSK_DEVICE_MAKE",
            Self::DeviceId => "TSK_DEVICE_ID",
            Self::Email => "TSK_EMAIL",
            Self::HashMd5 => "TSK_HASH_MD5",
            Self::HashSha1 => "TSK_HASH_SHA1",
            Self::HashSha2_256 => "TSK_HASH_SHA2_256",
            Self::HashSha2_512 => "TSK_HASH_SHA2_512",
            Self::Text => "TSK_TEXT",
            Self::TextFile => "TSK_TEXT_FILE",
            Self::TextLanguage => "TSK_TEXT_LANGUAGE",
            Self::Entropy => "TSK_ENTROPY",
            Self::HashsetName => "TSK_HASHSET_NAME",
            Self::InterestingFile => "TSK_INTERESTING_FILE",
            Self::Referrer => "TSK_REFERRER",
            Self::LastAccessed => "TSK_LAST_ACCESSED",
            Self::IpAddress => "TSK_IP_ADDRESS",
            Self::PhoneNumber => "TSK_PHONE_NUMBER",
            Self::PathId => "TSK_PATH_ID",
            Self::SetName => "TSK_SET_NAME",
            Self::EncryptionDetected => "TSK_ENCRYPTION_DETECTED",
            Self::MalwareDetected => "TSK_MALWARE_DETECTED",
            Self::StegDetected => "TSK_STEG_DETECTED",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Datetime => "Datetime",
            Self::Name => "Name",
            Self::ProgName => "Program Name",
            Self::Value => "Value",
            Self::Flag => "Flag",
            Self::Path => "Path",
            Self::Geo => "Geographic Coordinate",
            Self::Keyword => "Keyword",
            Self::KeywordRegexp => "Keyword Regular Expression",
            Self::KeywordPreview => "Keyword Preview",
            Self::KeywordSet => "Keyword Set",
            Self::Username => "Username",
            Self::Domain => "Domain",
            Self::Password => "Password",
            Self::NamePerson => "Person Name",
            Self::DeviceModel => "Device Model",
            Self::DeviceMake => "Device Make",
            Self::DeviceId => "Device ID",
            Self::Email => "Email",
            Self::HashMd5 => "MD5 Hash",
            Self::HashSha1 => "SHA1 Hash",
            Self::HashSha2_256 => "SHA2-256 Hash",
            Self::HashSha2_512 => "SHA2-512 Hash",
            Self::Text => "Text",
            Self::TextFile => "Text File",
            Self::TextLanguage => "Text Language",
            Self::Entropy => "Entropy",
            Self::HashsetName => "Hashset Name",
            Self::InterestingFile => "Interesting File",
            Self::Referrer => "Referrer URL",
            Self::LastAccessed => "Last Time Accessed",
            Self::IpAddress => "IP Address",
            Self::PhoneNumber => "Phone Number",
            Self::PathId => "Path ID",
            Self::SetName => "Set Name",
            Self::EncryptionDetected => "Encryption Detected",
            Self::MalwareDetected => "Malware Detected",
            Self::StegDetected => "Steganography Detected",
        }
    }

    pub fn from_id(id: i32) -> Option<Self> { Self::ALL.into_iter().find(|t| t.id() == id) }
}

static BUILTIN_ARTIFACT_TYPES: Lazy<BTreeMap<i32, TypeDescriptor>> = Lazy::new(|| {
    ArtifactType::ALL.iter()
                     .map(|t| (t.id(), TypeDescriptor { id: t.id(), name: t.type_name().to_string(), display_name: t.display_name().to_string() }))
                     .collect()
});

static BUILTIN_ATTRIBUTE_TYPES: Lazy<BTreeMap<i32, TypeDescriptor>> = Lazy::new(|| {
    AttributeType::ALL.iter()
                      .map(|t| (t.id(), TypeDescriptor { id: t.id(), name: t.type_name().to_string(), display_name: t.display_name().to_string() }))
                      .collect()
});

/// Enumeración fija de tipos de artifact built-in (id -> descriptor).
pub fn builtin_artifact_types() -> &'static BTreeMap<i32, TypeDescriptor> { &BUILTIN_ARTIFACT_TYPES }

/// Enumeración fija de tipos de atributo built-in (id -> descriptor).
pub fn builtin_attribute_types() -> &'static BTreeMap<i32, TypeDescriptor> { &BUILTIN_ATTRIBUTE_TYPES }

/// Tabla de tipos (una para artifacts, otra para atributos) con soporte para
/// tipos agregados en runtime.
#[derive(Debug, Clone)]
pub struct TypeTable {
    kind: &'static str,
    by_id: BTreeMap<i32, TypeDescriptor>,
}

impl TypeTable {
    pub fn artifacts() -> Self { Self { kind: "artifact", by_id: BUILTIN_ARTIFACT_TYPES.clone() } }

    pub fn attributes() -> Self { Self { kind: "attribute", by_id: BUILTIN_ATTRIBUTE_TYPES.clone() } }

    pub fn all(&self) -> &BTreeMap<i32, TypeDescriptor> { &self.by_id }

    pub fn get(&self, id: i32) -> Option<&TypeDescriptor> { self.by_id.get(&id) }

    pub fn id_of(&self, name: &str) -> Result<i32, StoreError> {
        self.by_id
            .values()
            .find(|d| d.name == name)
            .map(|d| d.id)
            .ok_or_else(|| StoreError::UnknownType(format!("no {} type named {name}", self.kind)))
    }

    pub fn name_of(&self, id: i32) -> Result<&str, StoreError> {
        self.by_id
            .get(&id)
            .map(|d| d.name.as_str())
            .ok_or_else(|| StoreError::UnknownType(format!("no {} type with id {id}", self.kind)))
    }

    pub fn display_name_of(&self, id: i32) -> Result<&str, StoreError> {
        self.by_id
            .get(&id)
            .map(|d| d.display_name.as_str())
            .ok_or_else(|| StoreError::UnknownType(format!("no {} type with id {id}", self.kind)))
    }

    /// Registra un tipo nuevo. Si ya existe uno con el mismo nombre se
    /// devuelve su id (idempotente); no se permite reutilizar un nombre con
    /// otro display name.
    pub fn register(&mut self, name: &str, display_name: &str) -> Result<i32, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::UnknownType(format!("{} type name is empty", self.kind)));
        }
        if let Some(existing) = self.by_id.values().find(|d| d.name == name) {
            if existing.display_name != display_name {
                return Err(StoreError::Conflict(format!("{} type {name} already registered as '{}'",
                                                        self.kind, existing.display_name)));
            }
            return Ok(existing.id);
        }
        let id = self.by_id.keys().next_back().map(|m| m + 1).unwrap_or(1);
        self.by_id.insert(id, TypeDescriptor { id, name: name.to_string(), display_name: display_name.to_string() });
        Ok(id)
    }
}
