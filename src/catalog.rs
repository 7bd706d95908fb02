/*!
 * High-level query interface over the BANCA metadata catalog.
 *
 * [`Catalog`] is what downstream evaluation code talks to: it resolves
 * group aliases, swaps the development and evaluation sets for T-norm and
 * Z-norm cohorts, and turns the protocol purpose tables into file lists.
 */

use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::database::models::{
    ClientGroup, ClientRecord, FileRecord, Gender, Group, Language, ProbeClass,
    ProtocolPurposeRecord, ProtocolRecord, Purpose, Subworld, SubworldRecord,
};
use crate::database::{ClientFilter, DatabaseConnection, DatabaseStats, FileFilter, Repository};
use crate::errors::CatalogError;
use crate::protocols::Protocol;

/// Query over the client roster. Unset fields select every valid value.
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    groups: Vec<Group>,
    genders: Vec<Gender>,
    subworld: Option<Subworld>,
}

impl ClientQuery {
    /// A query matching every client
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given protocol group (repeatable)
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Restrict to the given groups
    pub fn groups(mut self, groups: &[Group]) -> Self {
        self.groups.extend_from_slice(groups);
        self
    }

    /// Restrict to the given gender (repeatable)
    pub fn gender(mut self, gender: Gender) -> Self {
        self.genders.push(gender);
        self
    }

    /// Restrict the world portion to one split
    pub fn subworld(mut self, subworld: Subworld) -> Self {
        self.subworld = Some(subworld);
        self
    }
}

/// Query over the cataloged files. Unset fields select every valid value.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    protocols: Vec<Protocol>,
    purposes: Vec<Purpose>,
    groups: Vec<Group>,
    classes: Vec<ProbeClass>,
    model_ids: Vec<i64>,
    subworld: Option<Subworld>,
}

impl ObjectQuery {
    /// A query matching every cataloged file
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given protocol (repeatable)
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocols.push(protocol);
        self
    }

    /// Restrict to the given protocols
    pub fn protocols(mut self, protocols: &[Protocol]) -> Self {
        self.protocols.extend_from_slice(protocols);
        self
    }

    /// Restrict to the given purpose (repeatable)
    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purposes.push(purpose);
        self
    }

    /// Restrict to the given protocol group (repeatable)
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Restrict to the given groups
    pub fn groups(mut self, groups: &[Group]) -> Self {
        self.groups.extend_from_slice(groups);
        self
    }

    /// Restrict probes to the given access class (repeatable)
    pub fn class(mut self, class: ProbeClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Restrict to files of the given model identifiers. For impostor
    /// probes the identifiers are matched against the claimed identity.
    pub fn model_ids(mut self, ids: &[i64]) -> Self {
        self.model_ids.extend_from_slice(ids);
        self
    }

    /// Restrict world data to one split
    pub fn subworld(mut self, subworld: Subworld) -> Self {
        self.subworld = Some(subworld);
        self
    }
}

/// The BANCA metadata catalog
#[derive(Clone)]
pub struct Catalog {
    repo: Repository,
}

impl Catalog {
    /// Wrap an open catalog connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            repo: Repository::new(db),
        }
    }

    /// Open the catalog at the given path.
    ///
    /// The catalog must have been built with the `create` command; a
    /// missing file is a configuration error, not an empty catalog.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CatalogError::NotCreated {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Open the catalog at its default location
    pub fn open_default() -> Result<Self> {
        Self::open(DatabaseConnection::default_database_path()?)
    }

    /// The underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        self.repo.connection()
    }

    /// Catalog row counts and on-disk size
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.connection().stats()
    }

    // =========================================================================
    // Vocabulary
    // =========================================================================

    /// Names of the protocol groups
    pub fn groups() -> &'static [Group] {
        Group::all()
    }

    /// Names of the client enrollment groups
    pub fn client_groups() -> &'static [ClientGroup] {
        ClientGroup::all()
    }

    /// Registered genders
    pub fn genders() -> &'static [Gender] {
        Gender::all()
    }

    /// Registered languages
    pub fn languages() -> &'static [Language] {
        Language::all()
    }

    /// Registered purposes
    pub fn purposes() -> &'static [Purpose] {
        Purpose::all()
    }

    /// Registered protocol names
    pub fn protocol_names() -> Vec<String> {
        Protocol::all().iter().map(|p| p.to_string()).collect()
    }

    /// Registered subworld split names
    pub fn subworld_names() -> &'static [Subworld] {
        Subworld::all()
    }

    // =========================================================================
    // Clients and models
    // =========================================================================

    /// Clients matching the given query, ordered by identifier
    pub async fn clients(&self, query: &ClientQuery) -> Result<Vec<ClientRecord>> {
        let filter = ClientFilter {
            groups: query.groups.iter().map(|g| g.client_group()).collect(),
            genders: query.genders.clone(),
            subworld: query.subworld,
        };
        self.repo.clients(&filter).await
    }

    /// Models matching the given query. In BANCA every trial client has
    /// exactly one model, so this is the client query.
    pub async fn models(&self, query: &ClientQuery) -> Result<Vec<ClientRecord>> {
        self.clients(query).await
    }

    /// T-norm cohort clients for the given trial groups: the clients of
    /// the opposite group (`dev` normalizes against `eval` and vice versa).
    pub async fn tclients(&self, groups: &[Group]) -> Result<Vec<ClientRecord>> {
        let cohort = Self::cohort_groups(groups);
        self.clients(&ClientQuery::new().groups(&cohort)).await
    }

    /// Z-norm cohort clients, drawn the same way as the T-norm cohort
    pub async fn zclients(&self, groups: &[Group]) -> Result<Vec<ClientRecord>> {
        self.tclients(groups).await
    }

    /// T-norm cohort models
    pub async fn tmodels(&self, groups: &[Group]) -> Result<Vec<ClientRecord>> {
        self.tclients(groups).await
    }

    /// Look up a client by identifier
    pub async fn client(&self, id: i64) -> Result<ClientRecord> {
        self.repo
            .client_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::UnknownClient(id).into())
    }

    /// Whether a client with the given identifier is registered
    pub async fn has_client(&self, id: i64) -> Result<bool> {
        Ok(self.repo.client_by_id(id).await?.is_some())
    }

    /// The client identifier behind a model identifier (the identity map)
    pub fn client_id_from_model_id(&self, model_id: i64) -> i64 {
        model_id
    }

    /// The client identifier behind a T-norm model identifier
    pub fn client_id_from_tmodel_id(&self, tmodel_id: i64) -> i64 {
        tmodel_id
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Files matching the given query, ordered by
    /// (client, session, claimed identity, shot) and de-duplicated.
    pub async fn objects(&self, query: &ObjectQuery) -> Result<Vec<FileRecord>> {
        let groups: Vec<Group> = if query.groups.is_empty() {
            Group::all().to_vec()
        } else {
            query.groups.clone()
        };
        let purposes: Vec<Purpose> = if query.purposes.is_empty() {
            Purpose::all().to_vec()
        } else {
            query.purposes.clone()
        };
        let classes: Vec<ProbeClass> = if query.classes.is_empty() {
            vec![ProbeClass::Client, ProbeClass::Impostor]
        } else {
            query.classes.clone()
        };

        let mut merged: BTreeMap<i64, FileRecord> = BTreeMap::new();
        let mut collect = |files: Vec<FileRecord>| {
            for file in files {
                merged.entry(file.id).or_insert(file);
            }
        };

        // Background training data lives under the world group; the
        // purpose and class filters do not apply to it.
        if groups.contains(&Group::World) {
            collect(
                self.repo
                    .files_for_purpose(&FileFilter {
                        protocols: query.protocols.clone(),
                        groups: vec![Group::World],
                        purpose: Purpose::Train,
                        class_constraint: None,
                        model_ids: query.model_ids.clone(),
                        model_on_claimed: false,
                        subworld: query.subworld,
                    })
                    .await?,
            );
        }

        let trial: Vec<Group> = groups
            .iter()
            .copied()
            .filter(|g| *g != Group::World)
            .collect();

        if !trial.is_empty() {
            if purposes.contains(&Purpose::Enrol) {
                collect(
                    self.repo
                        .files_for_purpose(&FileFilter {
                            protocols: query.protocols.clone(),
                            groups: trial.clone(),
                            purpose: Purpose::Enrol,
                            class_constraint: None,
                            model_ids: query.model_ids.clone(),
                            model_on_claimed: false,
                            subworld: None,
                        })
                        .await?,
                );
            }

            if purposes.contains(&Purpose::Probe) {
                if classes.contains(&ProbeClass::Client) {
                    collect(
                        self.repo
                            .files_for_purpose(&FileFilter {
                                protocols: query.protocols.clone(),
                                groups: trial.clone(),
                                purpose: Purpose::Probe,
                                class_constraint: Some(ProbeClass::Client),
                                model_ids: query.model_ids.clone(),
                                model_on_claimed: false,
                                subworld: None,
                            })
                            .await?,
                    );
                }

                if classes.contains(&ProbeClass::Impostor) {
                    // Impostor probes are selected by the identity they
                    // claim, not by the attacker behind them.
                    collect(
                        self.repo
                            .files_for_purpose(&FileFilter {
                                protocols: query.protocols.clone(),
                                groups: trial,
                                purpose: Purpose::Probe,
                                class_constraint: Some(ProbeClass::Impostor),
                                model_ids: query.model_ids.clone(),
                                model_on_claimed: true,
                                subworld: None,
                            })
                            .await?,
                    );
                }
            }
        }

        let mut out: Vec<FileRecord> = merged.into_values().collect();
        out.sort_by_key(|f| (f.client_id, f.session_id, f.claimed_id, f.shot_id, f.id));
        Ok(out)
    }

    /// Files enrolling the T-norm cohort models: enrollment data of the
    /// opposite trial group.
    pub async fn tobjects(
        &self,
        protocols: &[Protocol],
        model_ids: &[i64],
        groups: &[Group],
    ) -> Result<Vec<FileRecord>> {
        let cohort = Self::cohort_groups(groups);
        self.objects(
            &ObjectQuery {
                protocols: protocols.to_vec(),
                purposes: vec![Purpose::Enrol],
                groups: cohort,
                classes: vec![ProbeClass::Client],
                model_ids: model_ids.to_vec(),
                subworld: None,
            },
        )
        .await
    }

    /// Files probing the Z-norm cohort: probe data of the opposite
    /// trial group.
    pub async fn zobjects(
        &self,
        protocols: &[Protocol],
        model_ids: &[i64],
        groups: &[Group],
    ) -> Result<Vec<FileRecord>> {
        let cohort = Self::cohort_groups(groups);
        self.objects(
            &ObjectQuery {
                protocols: protocols.to_vec(),
                purposes: vec![Purpose::Probe],
                groups: cohort,
                classes: Vec::new(),
                model_ids: model_ids.to_vec(),
                subworld: None,
            },
        )
        .await
    }

    fn cohort_groups(groups: &[Group]) -> Vec<Group> {
        let requested: Vec<Group> = if groups.is_empty() {
            vec![Group::Dev, Group::Eval]
        } else {
            groups.to_vec()
        };
        let mut cohort: Vec<Group> = requested
            .iter()
            .filter_map(|g| g.cohort_group())
            .collect();
        cohort.dedup();
        cohort
    }

    // =========================================================================
    // Protocols
    // =========================================================================

    /// All registered protocols
    pub async fn protocols(&self) -> Result<Vec<ProtocolRecord>> {
        self.repo.protocols().await
    }

    /// Look up a protocol record by name
    pub async fn protocol(&self, protocol: Protocol) -> Result<ProtocolRecord> {
        self.repo
            .protocol_by_name(protocol)
            .await?
            .ok_or_else(|| CatalogError::UnknownProtocol(protocol.to_string()).into())
    }

    /// Whether the given protocol is registered
    pub async fn has_protocol(&self, protocol: Protocol) -> Result<bool> {
        Ok(self.repo.protocol_by_name(protocol).await?.is_some())
    }

    /// All registered (protocol, group, purpose) triples
    pub async fn protocol_purposes(&self) -> Result<Vec<ProtocolPurposeRecord>> {
        self.repo.protocol_purposes().await
    }

    /// All registered subworld splits
    pub async fn subworlds(&self) -> Result<Vec<SubworldRecord>> {
        self.repo.subworlds().await
    }

    // =========================================================================
    // Path lookups
    // =========================================================================

    /// Complete on-disk paths for the given file identifiers, in input
    /// order. Unknown identifiers are skipped.
    pub async fn paths(
        &self,
        ids: &[i64],
        directory: Option<&Path>,
        extension: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let files = self.repo.files_by_ids(ids).await?;
        let by_id: BTreeMap<i64, &FileRecord> = files.iter().map(|f| (f.id, f)).collect();

        let mut out = Vec::new();
        for id in ids {
            match by_id.get(id) {
                Some(file) => out.push(file.make_path(directory, extension)),
                None => debug!("No file with id {} in the catalog", id),
            }
        }
        Ok(out)
    }

    /// Reverse lookup: file identifiers for the given path stems, in
    /// input order. Unknown stems are skipped.
    pub async fn reverse(&self, stems: &[String]) -> Result<Vec<i64>> {
        let files = self.repo.files_by_paths(stems).await?;
        let by_path: BTreeMap<&str, i64> = files.iter().map(|f| (f.path.as_str(), f.id)).collect();

        let mut out = Vec::new();
        for stem in stems {
            match by_path.get(stem.as_str()) {
                Some(id) => out.push(*id),
                None => debug!("No file with stem {} in the catalog", stem),
            }
        }
        Ok(out)
    }
}
