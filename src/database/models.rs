/*!
 * Catalog entity models and vocabulary enumerations.
 *
 * These structures map directly to database tables and provide
 * type-safe access to the cataloged metadata.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::protocols::Protocol;

/// Gender of an enrolled client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Female
    F,
    /// Male
    M,
}

impl Gender {
    /// All genders, in canonical order
    pub fn all() -> &'static [Gender] {
        &[Gender::F, Gender::M]
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::F => write!(f, "f"),
            Gender::M => write!(f, "m"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "f" | "female" => Ok(Gender::F),
            "m" | "male" => Ok(Gender::M),
            _ => Err(anyhow::anyhow!("Invalid gender: {}", s)),
        }
    }
}

/// Enrollment group of a client.
///
/// `g1` and `g2` clients take part in verification trials; `world` clients
/// only supply background training data. In protocol terms `g1` serves as
/// the development set and `g2` as the evaluation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientGroup {
    /// Development set clients
    G1,
    /// Evaluation set clients
    G2,
    /// Background model training clients
    World,
}

impl ClientGroup {
    /// All enrollment groups, in canonical order
    pub fn all() -> &'static [ClientGroup] {
        &[ClientGroup::G1, ClientGroup::G2, ClientGroup::World]
    }
}

impl fmt::Display for ClientGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientGroup::G1 => write!(f, "g1"),
            ClientGroup::G2 => write!(f, "g2"),
            ClientGroup::World => write!(f, "world"),
        }
    }
}

impl std::str::FromStr for ClientGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "g1" => Ok(ClientGroup::G1),
            "g2" => Ok(ClientGroup::G2),
            "world" => Ok(ClientGroup::World),
            _ => Err(anyhow::anyhow!("Invalid client group: {}", s)),
        }
    }
}

/// Protocol-level group designation. `dev` is an alias for the `g1`
/// clients and `eval` for the `g2` clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Background training data
    World,
    /// Development set (g1)
    Dev,
    /// Evaluation set (g2)
    Eval,
}

impl Group {
    /// All protocol groups, in canonical order
    pub fn all() -> &'static [Group] {
        &[Group::World, Group::Dev, Group::Eval]
    }

    /// The client enrollment group backing this protocol group
    pub fn client_group(&self) -> ClientGroup {
        match self {
            Group::World => ClientGroup::World,
            Group::Dev => ClientGroup::G1,
            Group::Eval => ClientGroup::G2,
        }
    }

    /// The opposite trial group, used to draw T-norm and Z-norm cohorts
    pub fn cohort_group(&self) -> Option<Group> {
        match self {
            Group::Dev => Some(Group::Eval),
            Group::Eval => Some(Group::Dev),
            Group::World => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::World => write!(f, "world"),
            Group::Dev => write!(f, "dev"),
            Group::Eval => write!(f, "eval"),
        }
    }
}

impl std::str::FromStr for Group {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "world" => Ok(Group::World),
            "dev" | "g1" => Ok(Group::Dev),
            "eval" | "g2" => Ok(Group::Eval),
            _ => Err(anyhow::anyhow!(
                "Invalid group: {}. Valid groups are world, dev (g1), eval (g2)",
                s
            )),
        }
    }
}

/// Language spoken in the recordings. Only the English part of BANCA
/// is cataloged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// English
    En,
}

impl Language {
    /// All cataloged languages
    pub fn all() -> &'static [Language] {
        &[Language::En]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => write!(f, "en"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Language::En),
            _ => Err(anyhow::anyhow!("Invalid language: {}", s)),
        }
    }
}

/// Role a set of files plays within a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Background model training
    Train,
    /// Model enrollment
    Enrol,
    /// Verification probes
    Probe,
}

impl Purpose {
    /// All purposes, in canonical order
    pub fn all() -> &'static [Purpose] {
        &[Purpose::Train, Purpose::Enrol, Purpose::Probe]
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Train => write!(f, "train"),
            Purpose::Enrol => write!(f, "enrol"),
            Purpose::Probe => write!(f, "probe"),
        }
    }
}

impl std::str::FromStr for Purpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Purpose::Train),
            "enrol" | "enroll" => Ok(Purpose::Enrol),
            "probe" => Ok(Purpose::Probe),
            _ => Err(anyhow::anyhow!("Invalid purpose: {}", s)),
        }
    }
}

/// Access class of a probe file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeClass {
    /// True client access: the claimed identity is the real one
    Client,
    /// Informed impostor attack: the claimed identity differs
    Impostor,
}

impl fmt::Display for ProbeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeClass::Client => write!(f, "client"),
            ProbeClass::Impostor => write!(f, "impostor"),
        }
    }
}

impl std::str::FromStr for ProbeClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(ProbeClass::Client),
            "impostor" => Ok(ProbeClass::Impostor),
            _ => Err(anyhow::anyhow!("Invalid probe class: {}", s)),
        }
    }
}

/// Named split of the world group into two disjoint parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subworld {
    /// The first third of the world clients
    OneThird,
    /// The remaining two thirds
    TwoThirds,
}

impl Subworld {
    /// All subworld splits
    pub fn all() -> &'static [Subworld] {
        &[Subworld::OneThird, Subworld::TwoThirds]
    }
}

impl fmt::Display for Subworld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subworld::OneThird => write!(f, "onethird"),
            Subworld::TwoThirds => write!(f, "twothirds"),
        }
    }
}

impl std::str::FromStr for Subworld {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onethird" => Ok(Subworld::OneThird),
            "twothirds" => Ok(Subworld::TwoThirds),
            _ => Err(anyhow::anyhow!("Invalid subworld: {}", s)),
        }
    }
}

/// An enrolled client record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Client identifier
    pub id: i64,
    /// Gender of the client
    pub gender: Gender,
    /// Enrollment group
    pub group: ClientGroup,
    /// Language spoken by the client
    pub language: Language,
}

/// A cataloged recording (one shot of one access)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Database identifier
    pub id: i64,
    /// Real identity of the recorded client
    pub client_id: i64,
    /// Relative path stem, unique, without extension
    pub path: String,
    /// Identity claimed during the access; equals `client_id` for
    /// true client accesses
    pub claimed_id: i64,
    /// Shot number within the access (1-based)
    pub shot_id: i64,
    /// Data session the access was recorded in (1-based)
    pub session_id: i64,
}

impl FileRecord {
    /// Whether this file records a true client access
    pub fn is_client_access(&self) -> bool {
        self.client_id == self.claimed_id
    }

    /// Build a complete on-disk path from the stem, prefixing an optional
    /// directory and appending an optional extension (including the
    /// leading dot, e.g. `.jpg`).
    pub fn make_path(&self, directory: Option<&Path>, extension: Option<&str>) -> PathBuf {
        let mut name = self.path.clone();
        if let Some(ext) = extension {
            name.push_str(ext);
        }
        match directory {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// A registered protocol record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    /// Database identifier
    pub id: i64,
    /// Protocol name
    pub name: Protocol,
}

/// A (protocol, group, purpose) triple record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolPurposeRecord {
    /// Database identifier
    pub id: i64,
    /// Protocol this purpose belongs to
    pub protocol: Protocol,
    /// Protocol group served
    pub group: Group,
    /// Role of the associated files
    pub purpose: Purpose,
}

/// A world split record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubworldRecord {
    /// Database identifier
    pub id: i64,
    /// Split name
    pub name: Subworld,
}
