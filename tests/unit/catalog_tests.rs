/*!
 * Unit tests for the catalog query interface
 */

use banca_db::catalog::{ClientQuery, ObjectQuery};
use banca_db::database::models::{ClientGroup, Gender, Group, ProbeClass, Purpose, Subworld};
use banca_db::protocols::Protocol;

use crate::common::populated_catalog;

#[tokio::test]
async fn test_clients_withEmptyQuery_shouldReturnFullRoster() {
    let catalog = populated_catalog().await;

    let clients = catalog
        .clients(&ClientQuery::new())
        .await
        .expect("Failed to query clients");
    assert_eq!(clients.len(), 82);

    // Ordered by identifier
    let ids: Vec<i64> = clients.iter().map(|c| c.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn test_clients_byGroup_shouldReturnGroupRoster() {
    let catalog = populated_catalog().await;

    let world = catalog
        .clients(&ClientQuery::new().group(Group::World))
        .await
        .expect("Failed to query world clients");
    assert_eq!(world.len(), 30);
    assert!(world.iter().all(|c| c.group == ClientGroup::World));

    let dev = catalog
        .clients(&ClientQuery::new().group(Group::Dev))
        .await
        .expect("Failed to query dev clients");
    assert_eq!(dev.len(), 26);
    assert!(dev.iter().all(|c| c.group == ClientGroup::G1));

    let eval = catalog
        .clients(&ClientQuery::new().group(Group::Eval))
        .await
        .expect("Failed to query eval clients");
    assert_eq!(eval.len(), 26);
    assert!(eval.iter().all(|c| c.group == ClientGroup::G2));
}

#[tokio::test]
async fn test_clients_byGender_shouldSplitGroupInHalf() {
    let catalog = populated_catalog().await;

    let females = catalog
        .clients(&ClientQuery::new().group(Group::Dev).gender(Gender::F))
        .await
        .expect("Failed to query female dev clients");
    assert_eq!(females.len(), 13);
    assert!(females.iter().all(|c| c.gender == Gender::F));
}

#[tokio::test]
async fn test_clients_bySubworld_shouldSplitWorldGroup() {
    let catalog = populated_catalog().await;

    let onethird = catalog
        .clients(
            &ClientQuery::new()
                .group(Group::World)
                .subworld(Subworld::OneThird),
        )
        .await
        .expect("Failed to query onethird clients");
    assert_eq!(onethird.len(), 10);

    let twothirds = catalog
        .clients(
            &ClientQuery::new()
                .group(Group::World)
                .subworld(Subworld::TwoThirds),
        )
        .await
        .expect("Failed to query twothirds clients");
    assert_eq!(twothirds.len(), 20);

    // The two splits partition the world group
    let overlap = onethird
        .iter()
        .filter(|c| twothirds.iter().any(|o| o.id == c.id))
        .count();
    assert_eq!(overlap, 0);
}

#[tokio::test]
async fn test_client_byId_shouldResolveOrFail() {
    let catalog = populated_catalog().await;

    let client = catalog.client(1001).await.expect("Client 1001 should exist");
    assert_eq!(client.gender, Gender::F);
    assert_eq!(client.group, ClientGroup::G1);

    assert!(catalog.has_client(9001).await.expect("has_client failed"));
    assert!(!catalog.has_client(4242).await.expect("has_client failed"));
    assert!(catalog.client(4242).await.is_err());
}

#[tokio::test]
async fn test_tclients_shouldComeFromOppositeGroup() {
    let catalog = populated_catalog().await;

    let cohort = catalog
        .tclients(&[Group::Dev])
        .await
        .expect("Failed to query T-norm cohort");
    assert_eq!(cohort.len(), 26);
    assert!(cohort.iter().all(|c| c.group == ClientGroup::G2));

    let zcohort = catalog
        .zclients(&[Group::Eval])
        .await
        .expect("Failed to query Z-norm cohort");
    assert_eq!(zcohort.len(), 26);
    assert!(zcohort.iter().all(|c| c.group == ClientGroup::G1));
}

#[tokio::test]
async fn test_objects_withEmptyQuery_shouldReturnEveryFile() {
    let catalog = populated_catalog().await;

    let files = catalog
        .objects(&ObjectQuery::new())
        .await
        .expect("Failed to query objects");
    assert_eq!(files.len(), 8040);

    // De-duplicated
    let mut ids: Vec<i64> = files.iter().map(|f| f.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8040);
}

#[tokio::test]
async fn test_objects_enrollmentSet_shouldMatchProtocolTable() {
    let catalog = populated_catalog().await;

    // Mc enrolls from session 1 only: 26 clients x 5 shots
    let enrol = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Enrol),
        )
        .await
        .expect("Failed to query enrollment set");
    assert_eq!(enrol.len(), 130);
    assert!(enrol.iter().all(|f| f.session_id == 1));
    assert!(enrol.iter().all(|f| f.is_client_access()));

    // G enrolls from one session per condition
    let g_enrol = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::G)
                .group(Group::Dev)
                .purpose(Purpose::Enrol),
        )
        .await
        .expect("Failed to query enrollment set");
    assert_eq!(g_enrol.len(), 390);
}

#[tokio::test]
async fn test_objects_probeSets_shouldSplitByClass() {
    let catalog = populated_catalog().await;

    let true_probes = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Probe)
                .class(ProbeClass::Client),
        )
        .await
        .expect("Failed to query client probes");
    // Sessions 2-4: 26 clients x 3 sessions x 5 shots
    assert_eq!(true_probes.len(), 390);
    assert!(true_probes.iter().all(|f| f.is_client_access()));

    let attacks = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Probe)
                .class(ProbeClass::Impostor),
        )
        .await
        .expect("Failed to query impostor probes");
    // Sessions 1-4: 26 attackers x 4 sessions x 5 shots
    assert_eq!(attacks.len(), 520);
    assert!(attacks.iter().all(|f| !f.is_client_access()));

    let both = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Probe),
        )
        .await
        .expect("Failed to query probes");
    assert_eq!(both.len(), 910);
}

#[tokio::test]
async fn test_objects_withModelIds_shouldFilterByClaimedIdentity() {
    let catalog = populated_catalog().await;

    // Enrollment of one model: its own session-1 shots
    let enrol = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::P)
                .group(Group::Dev)
                .purpose(Purpose::Enrol)
                .model_ids(&[1001]),
        )
        .await
        .expect("Failed to query model enrollment");
    assert_eq!(enrol.len(), 5);
    assert!(enrol.iter().all(|f| f.client_id == 1001));

    // Attacks against one model: one attacker per session claims it
    let attacks = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Probe)
                .class(ProbeClass::Impostor)
                .model_ids(&[1001]),
        )
        .await
        .expect("Failed to query attacks on model");
    assert_eq!(attacks.len(), 20);
    assert!(attacks.iter().all(|f| f.claimed_id == 1001));
    assert!(attacks.iter().all(|f| f.client_id != 1001));
}

#[tokio::test]
async fn test_objects_worldTraining_shouldIgnoreClassAndHonorSubworld() {
    let catalog = populated_catalog().await;

    let train = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::P)
                .group(Group::World)
                .purpose(Purpose::Train),
        )
        .await
        .expect("Failed to query training set");
    // 30 clients x 12 sessions x 5 shots
    assert_eq!(train.len(), 1800);

    let onethird = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::P)
                .group(Group::World)
                .purpose(Purpose::Train)
                .subworld(Subworld::OneThird),
        )
        .await
        .expect("Failed to query onethird training set");
    // 10 clients x 12 sessions x 5 shots
    assert_eq!(onethird.len(), 600);
}

#[tokio::test]
async fn test_objects_worldGroup_shouldIgnorePurposeFilter() {
    let catalog = populated_catalog().await;

    // World clients only supply training data; requesting another purpose
    // for the world group still selects all of it
    let files = catalog
        .objects(&ObjectQuery::new().group(Group::World).purpose(Purpose::Enrol))
        .await
        .expect("Failed to query world files");
    assert_eq!(files.len(), 1800);

    let probes = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::World)
                .purpose(Purpose::Probe)
                .class(ProbeClass::Impostor),
        )
        .await
        .expect("Failed to query world files");
    assert_eq!(probes.len(), 1800);
}

#[tokio::test]
async fn test_tobjectsAndZobjects_shouldDrawFromOppositeGroup() {
    let catalog = populated_catalog().await;

    let tfiles = catalog
        .tobjects(&[Protocol::Mc], &[], &[Group::Dev])
        .await
        .expect("Failed to query T-norm files");
    // Enrollment set of the eval group
    assert_eq!(tfiles.len(), 130);
    assert!(tfiles.iter().all(|f| f.client_id >= 2001));

    let zfiles = catalog
        .zobjects(&[Protocol::Mc], &[], &[Group::Dev])
        .await
        .expect("Failed to query Z-norm files");
    // Probe set of the eval group, both classes
    assert_eq!(zfiles.len(), 910);
    assert!(zfiles.iter().all(|f| f.client_id >= 2001));
}

#[tokio::test]
async fn test_protocolTables_shouldBeFullyRegistered() {
    let catalog = populated_catalog().await;

    let protocols = catalog.protocols().await.expect("Failed to query protocols");
    assert_eq!(protocols.len(), 7);

    assert!(catalog
        .has_protocol(Protocol::Ua)
        .await
        .expect("has_protocol failed"));
    let record = catalog
        .protocol(Protocol::Mc)
        .await
        .expect("Protocol Mc should be registered");
    assert_eq!(record.name, Protocol::Mc);

    // 7 protocols x (world train + 2 groups x 2 purposes)
    let purposes = catalog
        .protocol_purposes()
        .await
        .expect("Failed to query purposes");
    assert_eq!(purposes.len(), 35);

    let subworlds = catalog.subworlds().await.expect("Failed to query subworlds");
    assert_eq!(subworlds.len(), 2);
}

#[tokio::test]
async fn test_pathsAndReverse_shouldRoundTripInInputOrder() {
    let catalog = populated_catalog().await;

    let files = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Mc)
                .group(Group::Dev)
                .purpose(Purpose::Enrol)
                .model_ids(&[1001]),
        )
        .await
        .expect("Failed to query files");
    assert!(!files.is_empty());

    let mut ids: Vec<i64> = files.iter().map(|f| f.id).collect();
    ids.reverse();

    let paths = catalog
        .paths(&ids, None, None)
        .await
        .expect("Failed to resolve paths");
    assert_eq!(paths.len(), ids.len());

    let stems: Vec<String> = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let resolved = catalog
        .reverse(&stems)
        .await
        .expect("Failed to reverse stems");
    assert_eq!(resolved, ids);
}

#[tokio::test]
async fn test_pathsAndReverse_withUnknownEntries_shouldSkipThem() {
    let catalog = populated_catalog().await;

    let paths = catalog
        .paths(&[999_999], None, None)
        .await
        .expect("Failed to resolve paths");
    assert!(paths.is_empty());

    let ids = catalog
        .reverse(&["g1/0000/not_a_stem".to_string()])
        .await
        .expect("Failed to reverse stems");
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_paths_withDirectoryAndExtension_shouldDecorateStems() {
    let catalog = populated_catalog().await;

    let files = catalog
        .objects(&ObjectQuery::new().model_ids(&[9001]).group(Group::World))
        .await
        .expect("Failed to query files");
    let paths = catalog
        .paths(
            &[files[0].id],
            Some(std::path::Path::new("/data/banca")),
            Some(".ppm"),
        )
        .await
        .expect("Failed to resolve paths");
    assert_eq!(paths.len(), 1);
    let rendered = paths[0].to_string_lossy();
    assert!(rendered.starts_with("/data/banca/world/9001/"));
    assert!(rendered.ends_with(".ppm"));
}
