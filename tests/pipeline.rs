use bubblemap::address::Chain;
use bubblemap::controller::{RebuildKind, UpdateController};
use bubblemap::graph::{FilterConfig, LinkKind};
use bubblemap::layout::{LinkPath, SimulationParams};
use bubblemap::session::{Session, TokenDataset};
use bubblemap::source::{HolderRecord, InteractionEdge, Transaction};
use eframe::egui::vec2;

fn session() -> Session {
    let mut session = Session::new(FilterConfig::default());
    session.track_token(TokenDataset::new(
        "T1",
        Chain::Solana,
        vec![
            HolderRecord::new("A", 100.0),
            HolderRecord::new("B", 50.0),
            HolderRecord::new("C", 10.0),
        ],
    ));
    session.track_token(TokenDataset::new(
        "T2",
        Chain::Solana,
        vec![HolderRecord::new("b", 70.0), HolderRecord::new("D", 30.0)],
    ));
    session
}

fn controller() -> UpdateController {
    UpdateController::new(vec2(1000.0, 800.0), SimulationParams::default())
}

fn run_to_rest(controller: &mut UpdateController) {
    for _ in 0..2_000 {
        if !controller.tick() {
            return;
        }
    }
    panic!("simulation never came to rest");
}

fn transaction(volume_usd: f64) -> Transaction {
    Transaction {
        transaction_hash: None,
        block_timestamp: None,
        volume_usd,
        token_symbol: None,
    }
}

#[test]
fn streamed_batches_patch_links_and_the_layout_settles() {
    let mut session = session();
    let mut controller = controller();

    assert_eq!(controller.sync(&mut session), RebuildKind::Full);
    assert_eq!(controller.graph().nodes.len(), 4);
    let shared = controller.graph().node("b").expect("shared holder");
    assert_eq!(shared.connected_tokens.len(), 2);

    let batches = [
        vec![InteractionEdge::new("A", "B", 10.0, 5.0)],
        vec![InteractionEdge::new("C", "a", 1.0, 1.0)],
    ];
    for batch in batches {
        assert!(session.append_interactions("T1", batch));
        assert_eq!(controller.sync(&mut session), RebuildKind::LinksOnly);
    }
    assert_eq!(controller.graph().links.len(), 2);

    run_to_rest(&mut controller);
    let simulation = controller.simulation().expect("mounted");
    assert!(!simulation.is_running());
    assert!(
        simulation
            .nodes()
            .iter()
            .all(|node| node.pos.x.is_finite() && node.pos.y.is_finite())
    );
}

#[test]
fn deleted_holder_comes_back_where_it_was() {
    let mut session = session();
    let mut controller = controller();
    controller.sync(&mut session);
    run_to_rest(&mut controller);
    let before = controller
        .simulation()
        .and_then(|simulation| simulation.position("c"))
        .expect("c is on the map");

    assert!(session.delete_node("C", false));
    assert_eq!(controller.sync(&mut session), RebuildKind::Full);
    assert!(controller.graph().node("c").is_none());

    assert!(session.restore_node("C"));
    assert_eq!(controller.sync(&mut session), RebuildKind::Full);
    let after = controller
        .simulation()
        .and_then(|simulation| simulation.position("c"));
    assert_eq!(after, Some(before));
    assert!(session.overrides().deleted_snapshots.is_empty());
}

#[test]
fn expanded_link_fans_out_and_collapses_in_place() {
    let mut session = session();
    let mut controller = controller();
    session.append_interactions("T1", vec![InteractionEdge::new("A", "B", 10.0, 5.0)]);
    controller.sync(&mut session);

    assert!(session.expand_link(
        "a",
        "b",
        vec![transaction(4.0), transaction(-2.0), transaction(9.0)]
    ));
    assert_eq!(controller.sync(&mut session), RebuildKind::LinksOnly);
    let links = &controller.graph().links;
    assert_eq!(links.len(), 3);
    assert!(
        links
            .iter()
            .all(|link| matches!(link.kind, LinkKind::Transaction { total_transactions: 3, .. }))
    );
    let curves = controller
        .link_paths()
        .into_iter()
        .filter(|(_, path)| matches!(path, LinkPath::Curve { .. }))
        .count();
    assert_eq!(curves, 3);

    assert!(session.collapse_link("b", "a"));
    assert_eq!(controller.sync(&mut session), RebuildKind::LinksOnly);
    assert_eq!(controller.graph().links.len(), 1);
}

#[test]
fn removing_a_token_keeps_shared_holders_and_evicts_the_rest() {
    let mut session = session();
    let mut controller = controller();
    controller.sync(&mut session);
    run_to_rest(&mut controller);
    let shared_before = controller
        .simulation()
        .and_then(|simulation| simulation.position("b"));

    let evicted = session.remove_token("T2");
    assert!(evicted.contains(&"d".to_owned()));
    assert!(!evicted.contains(&"b".to_owned()));

    assert_eq!(controller.sync(&mut session), RebuildKind::Full);
    assert!(controller.graph().node("d").is_none());
    assert!(controller.remembered_position("d").is_none());
    let shared = controller.graph().node("b").expect("still held through T1");
    assert_eq!(shared.connected_tokens.len(), 1);
    assert_eq!(
        controller
            .simulation()
            .and_then(|simulation| simulation.position("b")),
        shared_before
    );

    // Interactions still in flight for the removed token are dropped.
    assert!(!session.append_interactions("T2", vec![InteractionEdge::new("B", "D", 1.0, 0.0)]));
    assert_eq!(controller.sync(&mut session), RebuildKind::None);
}
