/*!
 * Catalog population.
 *
 * The raw BANCA recordings are distributed separately by their owners;
 * this module builds the local metadata catalog that indexes them:
 * clients, world splits, file stems and the protocol purpose tables.
 * Population is deterministic, so two catalogs built from the same crate
 * version are identical.
 */

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::database::models::{
    ClientGroup, ClientRecord, Gender, Group, Language, Purpose, Subworld,
};
use crate::database::{DatabaseConnection, Repository};
use crate::errors::CatalogError;
use crate::protocols::{Protocol, SESSION_COUNT, SHOT_COUNT};

/// Clients per trial group (g1 and g2), half female half male
pub const TRIAL_GROUP_SIZE: i64 = 26;

/// Clients in the world group, half female half male
pub const WORLD_GROUP_SIZE: i64 = 30;

/// World clients placed in the `onethird` split; the rest form `twothirds`
pub const ONETHIRD_SIZE: i64 = 10;

const G1_ID_BASE: i64 = 1000;
const G2_ID_BASE: i64 = 2000;
const WORLD_ID_BASE: i64 = 9000;

/// Summary of a finished population run
#[derive(Debug, Clone)]
pub struct PopulationSummary {
    /// Clients inserted
    pub clients: usize,
    /// Files inserted
    pub files: usize,
    /// Protocols inserted
    pub protocols: usize,
    /// (protocol, group, purpose) triples inserted
    pub purposes: usize,
    /// Purpose-file associations inserted
    pub associations: usize,
}

impl std::fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} clients, {} files, {} protocols, {} purposes, {} associations",
            self.clients, self.files, self.protocols, self.purposes, self.associations
        )
    }
}

/// One generated file row, before and after insertion
#[derive(Debug, Clone)]
struct FileSeed {
    id: i64,
    client_id: i64,
    group: ClientGroup,
    claimed_id: i64,
    session_id: i64,
    shot_id: i64,
    path: String,
}

impl FileSeed {
    fn is_client_access(&self) -> bool {
        self.client_id == self.claimed_id
    }
}

fn stem(client: &ClientRecord, session_id: i64, claimed_id: i64, shot_id: i64) -> String {
    format!(
        "{group}/{id:04}/{id:04}_{gender}_{group}_s{session:02}_{claimed:04}_en_{shot}",
        group = client.group,
        id = client.id,
        gender = client.gender,
        session = session_id,
        claimed = claimed_id,
        shot = shot_id,
    )
}

/// The deterministic client roster
pub(crate) fn generate_clients() -> Vec<ClientRecord> {
    let mut clients = Vec::new();

    for (group, base, size) in [
        (ClientGroup::G1, G1_ID_BASE, TRIAL_GROUP_SIZE),
        (ClientGroup::G2, G2_ID_BASE, TRIAL_GROUP_SIZE),
        (ClientGroup::World, WORLD_ID_BASE, WORLD_GROUP_SIZE),
    ] {
        for n in 1..=size {
            let gender = if n <= size / 2 { Gender::F } else { Gender::M };
            clients.push(ClientRecord {
                id: base + n,
                gender,
                group,
                language: Language::En,
            });
        }
    }

    clients
}

/// Generate every file row.
///
/// World clients contribute one true access per session (training data).
/// Trial clients additionally stage one informed impostor attack per
/// session, claiming the identity of another same-gender client of their
/// group; the target rotates with the session so that over the twelve
/// sessions every client attacks every other same-gender client of the
/// group at least once.
fn generate_files(clients: &[ClientRecord]) -> Vec<FileSeed> {
    let mut seeds = Vec::new();

    for client in clients {
        for session_id in 1..=SESSION_COUNT {
            for shot_id in 1..=SHOT_COUNT {
                seeds.push(FileSeed {
                    id: 0,
                    client_id: client.id,
                    group: client.group,
                    claimed_id: client.id,
                    session_id,
                    shot_id,
                    path: stem(client, session_id, client.id, shot_id),
                });
            }
        }

        if client.group == ClientGroup::World {
            continue;
        }

        let cohort: Vec<i64> = clients
            .iter()
            .filter(|c| c.group == client.group && c.gender == client.gender)
            .map(|c| c.id)
            .collect();
        let index = cohort
            .iter()
            .position(|id| *id == client.id)
            .expect("client missing from its own cohort");

        for session_id in 1..=SESSION_COUNT {
            // Rotating target; never the attacker because the cohort size
            // (13) does not divide any session offset (1..=12).
            let target = cohort[(index + session_id as usize) % cohort.len()];
            for shot_id in 1..=SHOT_COUNT {
                seeds.push(FileSeed {
                    id: 0,
                    client_id: client.id,
                    group: client.group,
                    claimed_id: target,
                    session_id,
                    shot_id,
                    path: stem(client, session_id, target, shot_id),
                });
            }
        }
    }

    seeds
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("█▓▒░"));
    pb
}

/// Build and populate the catalog in a single transaction.
///
/// Fails with [`CatalogError::AlreadyPopulated`] if the catalog already
/// holds data and `force` is false; with `force` the existing rows are
/// cleared first.
pub async fn populate(db: &DatabaseConnection, force: bool) -> Result<PopulationSummary> {
    let repo = Repository::new(db.clone());
    if repo.has_data().await? {
        if !force {
            return Err(CatalogError::AlreadyPopulated.into());
        }
        info!("Clearing existing catalog content before rebuild");
    }

    let clients = generate_clients();
    let mut seeds = generate_files(&clients);

    let pb = progress_bar((clients.len() + seeds.len()) as u64);
    pb.set_message("populating catalog");
    let bar = pb.clone();

    let summary = db
        .transaction_async(move |tx| {
            if force {
                crate::database::schema::clear_all_tables(tx)?;
            }

            for client in &clients {
                Repository::insert_client(tx, client)?;
                bar.inc(1);
            }

            // World splits
            let onethird_id = Repository::insert_subworld(tx, Subworld::OneThird)?;
            let twothirds_id = Repository::insert_subworld(tx, Subworld::TwoThirds)?;
            let world_ids: Vec<i64> = clients
                .iter()
                .filter(|c| c.group == ClientGroup::World)
                .map(|c| c.id)
                .collect();
            for (rank, client_id) in world_ids.iter().enumerate() {
                let subworld_id = if (rank as i64) < ONETHIRD_SIZE {
                    onethird_id
                } else {
                    twothirds_id
                };
                Repository::add_subworld_member(tx, subworld_id, *client_id)?;
            }

            for seed in seeds.iter_mut() {
                seed.id = Repository::insert_file(
                    tx,
                    seed.client_id,
                    &seed.path,
                    seed.claimed_id,
                    seed.shot_id,
                    seed.session_id,
                )?;
                bar.inc(1);
            }

            let mut purposes = 0usize;
            let mut associations = 0usize;

            for protocol in Protocol::all() {
                let protocol_id = Repository::insert_protocol(tx, *protocol)?;
                let def = protocol.definition();

                let train_id =
                    Repository::insert_protocol_purpose(tx, protocol_id, Group::World, Purpose::Train)?;
                purposes += 1;
                for seed in seeds.iter().filter(|s| s.group == ClientGroup::World) {
                    Repository::associate_file(tx, train_id, seed.id)?;
                    associations += 1;
                }

                for group in [Group::Dev, Group::Eval] {
                    let client_group = group.client_group();

                    let enrol_id = Repository::insert_protocol_purpose(
                        tx,
                        protocol_id,
                        group,
                        Purpose::Enrol,
                    )?;
                    purposes += 1;
                    for seed in seeds.iter().filter(|s| {
                        s.group == client_group
                            && s.is_client_access()
                            && def.enroll_sessions.contains(&s.session_id)
                    }) {
                        Repository::associate_file(tx, enrol_id, seed.id)?;
                        associations += 1;
                    }

                    let probe_id = Repository::insert_protocol_purpose(
                        tx,
                        protocol_id,
                        group,
                        Purpose::Probe,
                    )?;
                    purposes += 1;
                    for seed in seeds.iter().filter(|s| {
                        s.group == client_group
                            && ((s.is_client_access()
                                && def.client_probe_sessions.contains(&s.session_id))
                                || (!s.is_client_access()
                                    && def.impostor_probe_sessions.contains(&s.session_id)))
                    }) {
                        Repository::associate_file(tx, probe_id, seed.id)?;
                        associations += 1;
                    }
                }
            }

            Ok(PopulationSummary {
                clients: clients.len(),
                files: seeds.len(),
                protocols: Protocol::all().len(),
                purposes,
                associations,
            })
        })
        .await?;

    pb.finish_with_message("catalog populated");
    info!("Catalog populated: {}", summary);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generateClients_shouldProduceExpectedRoster() {
        let clients = generate_clients();
        assert_eq!(
            clients.len() as i64,
            2 * TRIAL_GROUP_SIZE + WORLD_GROUP_SIZE
        );

        let g1: Vec<_> = clients
            .iter()
            .filter(|c| c.group == ClientGroup::G1)
            .collect();
        assert_eq!(g1.len() as i64, TRIAL_GROUP_SIZE);
        assert_eq!(
            g1.iter().filter(|c| c.gender == Gender::F).count(),
            g1.iter().filter(|c| c.gender == Gender::M).count()
        );

        // Identifiers are unique
        let mut ids: Vec<i64> = clients.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), clients.len());
    }

    #[test]
    fn test_generateFiles_shouldProduceUniquePaths() {
        let clients = generate_clients();
        let seeds = generate_files(&clients);

        let mut paths: Vec<&str> = seeds.iter().map(|s| s.path.as_str()).collect();
        paths.sort_unstable();
        let before = paths.len();
        paths.dedup();
        assert_eq!(paths.len(), before);
    }

    #[test]
    fn test_generateFiles_worldClients_shouldHaveOnlyTrueAccesses() {
        let clients = generate_clients();
        let seeds = generate_files(&clients);

        for seed in seeds.iter().filter(|s| s.group == ClientGroup::World) {
            assert!(seed.is_client_access());
        }

        let world_count = seeds
            .iter()
            .filter(|s| s.group == ClientGroup::World)
            .count() as i64;
        assert_eq!(world_count, WORLD_GROUP_SIZE * SESSION_COUNT * SHOT_COUNT);
    }

    #[test]
    fn test_generateFiles_impostorAttacks_shouldStayInGroupAndGender() {
        let clients = generate_clients();
        let seeds = generate_files(&clients);

        for seed in seeds.iter().filter(|s| !s.is_client_access()) {
            let attacker = clients.iter().find(|c| c.id == seed.client_id).unwrap();
            let target = clients.iter().find(|c| c.id == seed.claimed_id).unwrap();
            assert_eq!(attacker.group, target.group);
            assert_eq!(attacker.gender, target.gender);
            assert_ne!(attacker.id, target.id);
        }
    }

    #[test]
    fn test_generateFiles_eachTargetAttackedOncePerSession() {
        let clients = generate_clients();
        let seeds = generate_files(&clients);

        // Within one session and one (group, gender) cohort the rotation is
        // a bijection: every member is claimed exactly once.
        let g1_female: Vec<i64> = clients
            .iter()
            .filter(|c| c.group == ClientGroup::G1 && c.gender == Gender::F)
            .map(|c| c.id)
            .collect();

        for session in 1..=SESSION_COUNT {
            for target in &g1_female {
                let attackers = seeds
                    .iter()
                    .filter(|s| {
                        !s.is_client_access()
                            && s.session_id == session
                            && s.shot_id == 1
                            && s.claimed_id == *target
                    })
                    .count();
                assert_eq!(attackers, 1);
            }
        }
    }

    #[tokio::test]
    async fn test_populate_shouldRejectSecondRunWithoutForce() {
        let db = DatabaseConnection::new_in_memory().expect("Failed to create catalog");

        populate(&db, false).await.expect("First population failed");
        let second = populate(&db, false).await;
        assert!(second.is_err());

        // force rebuild succeeds and leaves the same row counts
        let summary = populate(&db, true).await.expect("Forced rebuild failed");
        let stats = db.stats().expect("Failed to get stats");
        assert_eq!(stats.file_count as usize, summary.files);
        assert_eq!(stats.client_count as usize, summary.clients);
    }
}
