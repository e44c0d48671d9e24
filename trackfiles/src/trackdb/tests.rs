use crate::diagnostics::Diagnostics;
use crate::output::tdb::write_tdb;
use crate::trackdb::items::*;
use crate::trackdb::*;
use crate::*;
use std::f32::consts::PI;

const TDB: &str = r#"SIMISA@@@@@@@@@@JINX0T0t______

TrackDB (
	Serial ( 12 )
	TrackNodes ( 4
		TrackNode ( 1
			TrEndNode ( 0 )
			UiD ( -6000 14000 1 0 -6000 14000 100 0 200 0 0 0 )
			TrPins ( 1 0 TrPin ( 2 1 ) )
		)
		TrackNode ( 2
			TrVectorNode (
				TrVectorSections ( 1 11 22 -6000 14000 5 0 0 00 -6000 14000 100 0 200 0 0 0 )
				TrItemRefs ( 2 TrItemRef ( 0 ) TrItemRef ( 1 ) )
			)
			TrPins ( 1 1 TrPin ( 1 1 ) TrPin ( 3 1 ) )
		)
		TrackNode ( 3
			TrJunctionNode ( 0 35 "tail" )
			UiD ( -6000 14000 77 0 -6000 14000 300 0 200 0 0 0 )
			TrPins ( 1 1 TrPin ( 2 0 ) TrPin ( 4 1 ) )
		)
		TrackNode ( 4
			TrEndNode ( 0 )
			TrPins ( 1 0 TrPin ( 9 1 ) )
		)
	)
	TrItemTable ( 6
		SignalItem (
			TrItemId ( 0 )
			TrItemSData ( 150.5 00000002 )
			TrItemRData ( 1 2 3 -6000 14000 )
			TrSignalType ( 00000000 1 0.5 "HomeSig" )
			TrSignalDirs ( 1 TrSignalDir ( 3 0 1 0 ) )
		)
		SpeedPostItem (
			TrItemId ( 1 )
			SpeedpostTrItemData ( 274 60 60 1.5 )
		)
		PlatformItem (
			TrItemId ( 2 )
			PlatformName ( "Platform 1" )
			Station ( "Central" )
			PlatformMinWaitingTime ( 60 )
			PlatformNumPassengersWaiting ( 5 )
			PlatformTrItemData ( 00000000 3 )
		)
		CrossoverItem ( TrItemId ( 3 ) CrossoverTrItemData ( 2 7 ) )
		MysteryItem ( TrItemId ( 4 ) )
		SpeedPostItem ( TrItemId ( 5 ) SpeedpostTrItemData ( 0 12.7 4 ) )
	)
)
"#;

fn parse(src: &str) -> (TrackDB, Diagnostics) {
    let mut diag = Diagnostics::new();
    let db = get_track_db_string(src, "test.tdb", &mut diag).unwrap();
    (db, diag)
}

fn xrefs() -> TrackCircuitXRefList {
    let mut list = TrackCircuitXRefList::new();
    list.push(TrackCircuitSectionXref::new(10, 100.0, 0.0, 200.0));
    list.push(TrackCircuitSectionXref::new(20, 100.0, 100.0, 100.0));
    list.push(TrackCircuitSectionXref::new(30, 100.0, 200.0, 0.0));
    list
}

#[test]
fn nodes() {
    let (db, _) = parse(TDB);
    assert_eq!(db.serial, Some(12));
    assert_eq!(db.node_count(), 4);
    assert!(db.node(0).is_none());
    assert!(db.node(1).unwrap().is_end());

    let vector = db.node(2).unwrap().vector().unwrap();
    assert_eq!(vector.sections.len(), 1);
    assert_eq!(vector.sections[0].section_index, 11);
    assert_eq!(vector.sections[0].flag3, "00");
    assert_eq!(vector.sections[0].z, 200.0);
    assert_eq!(vector.item_refs.as_slice(), &[0, 1]);

    let junction = db.node(3).unwrap().junction().unwrap();
    assert_eq!(junction.shape_index, 35);
    assert_eq!(junction.tail, Some("tail".to_string()));
    assert_eq!(db.node(3).unwrap().uid.unwrap().world_id, 77);
}

#[test]
fn junction_with_missing_pin_is_kept() {
    let (db, diag) = parse(TDB);
    let node = db.node(3).unwrap();
    assert_eq!(node.pins.len(), 2);
    assert_eq!(node.expected_pins(), [3, 1, 2]);
    assert!(diag.contains("Track node 3 has unexpected number of pins; expected 3, got 2"));
    assert!(diag.contains("Track node 3 has unexpected number of output pins; expected 2, got 1"));
    assert!(!diag.contains("Track node 3 has unexpected number of input pins"));
}

#[test]
fn invalid_pin_links() {
    let (db, diag) = parse(TDB);
    assert!(diag.contains("Track node 4 pin 0 has invalid link to track node 9"));
    assert_eq!(diag.warnings().count(), 4);
    assert_eq!(db.node(4).unwrap().pins[0].link, 9);
    assert!(db.linked_node(4, 0).is_none());
    assert_eq!(db.linked_node(1, 0).unwrap().index, 2);
    assert_eq!(db.linked_node(2, 1).unwrap().index, 3);
    assert!(db.linked_node(2, 5).is_none());
}

#[test]
fn items() {
    let (db, diag) = parse(TDB);
    assert_eq!(db.items.len(), 6);
    for (i, item) in db.items.iter().enumerate() {
        assert_eq!(item.id, i);
    }

    let signal = db.item(0).unwrap();
    assert_eq!(signal.sdata, Some(SData { distance: 150.5, flags: "00000002".to_string() }));
    assert_eq!(signal.rdata.unwrap().z, 3.0);
    match signal.kind {
        TrItemKind::Signal(ref s) => {
            assert_eq!(s.signal_type, "homesig");
            assert_eq!(s.direction, 1);
            assert_eq!(s.reverse_direction(), 0);
            assert_eq!(s.dir_count, 1);
            assert_eq!(s.dirs, vec![SignalDir { node: 3, sd1: 0, link_lr_path: 1, sd3: 0 }]);
        }
        ref x => panic!("unexpected {:?}", x),
    }

    let platform = db.item(2).unwrap();
    assert_eq!(platform.name, Some("Platform 1".to_string()));
    assert_eq!(platform.kind,
               TrItemKind::Platform(PlatformItem {
                   station: "Central".to_string(),
                   flags: "00000000".to_string(),
                   min_waiting_time: 60,
                   passengers_waiting: 5,
                   linked_id: 3,
               }));

    assert_eq!(db.item(3).unwrap().kind, TrItemKind::Crossover { node: 2, shape: 7 });
    assert_eq!(db.item(4).unwrap().kind, TrItemKind::Empty);
    assert!(diag.contains("Unknown track item MysteryItem, kept as an empty item"));
}

#[test]
fn speed_posts() {
    let (db, _) = parse(TDB);
    match db.item(1).unwrap().kind {
        TrItemKind::SpeedPost(ref p) => {
            assert!(p.is_limit && p.is_mph && p.show_number);
            assert!(!p.is_milepost && !p.is_warning && !p.show_dot);
            assert_eq!(p.value, 60.0);
            assert_eq!(p.display_number, 60);
            assert_eq!(p.angle, 1.5);
        }
        ref x => panic!("unexpected {:?}", x),
    }
    match db.item(5).unwrap().kind {
        TrItemKind::SpeedPost(ref p) => {
            assert!(p.is_milepost);
            assert_eq!(p.value, 12.0);
            assert!((p.angle - (4.0 - 2.0 * PI)).abs() < 1e-5);
        }
        ref x => panic!("unexpected {:?}", x),
    }
}

#[test]
fn speed_post_flags() {
    let resume = SpeedPostItem::from_flags(3);
    assert!(resume.is_resume && resume.is_limit && !resume.is_warning);
    assert!(!resume.reads_value());

    let warning = SpeedPostItem::from_flags(1);
    assert!(warning.is_warning && !warning.is_limit && !warning.is_resume);

    let both = SpeedPostItem::from_flags(2 | (1 << 7));
    assert!(both.is_passenger && both.is_freight);

    let dotted = SpeedPostItem::from_flags(2 | (1 << 4) | (1 << 9));
    assert!(dotted.show_number && dotted.show_dot);

    // milepost ignores the other flags
    let milepost = SpeedPostItem::from_flags(1 << 8);
    assert!(milepost.is_milepost && !milepost.is_mph);
    assert!(milepost.reads_value());
}

#[test]
fn angles_wrap() {
    assert_eq!(wrap_angle(1.0), 1.0);
    assert_eq!(wrap_angle(PI), PI);
    assert!((wrap_angle(-PI) - PI).abs() < 1e-6);
    assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
    assert!((wrap_angle(-5.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
}

#[test]
fn junction_lookup() {
    let (db, _) = parse(TDB);
    let mut diag = Diagnostics::new();
    assert_eq!(db.junction_node_at(-6000, 14000, 77, &mut diag).unwrap().index, 3);
    assert!(diag.is_empty());
    // end node 1 has a UiD but is not a junction
    assert!(db.junction_node_at(-6000, 14000, 1, &mut diag).is_none());
    assert!(db.junction_node_at(1, 2, 77, &mut diag).is_none());
    assert_eq!(diag.len(), 2);
    assert!(diag.contains("{TileX:1 TileZ:2} track node 77 could not be found in TDB"));
}

#[test]
fn appended_items_are_numbered_after_existing_ones() {
    let mut db = TrackDB::new("test.tdb");
    db.append_tr_items((0..5).map(|_| TrItem::new(TrItemKind::Empty)).collect());
    let ids = db.append_tr_items(vec![TrItem::new(TrItemKind::Hazard),
                                      TrItem::new(TrItemKind::Pickup),
                                      TrItem::new(TrItemKind::LevelCrossing)]);
    assert_eq!(ids, 5..8);
    let all: Vec<usize> = db.items.iter().map(|i| i.id).collect();
    assert_eq!(all, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(db.item(6).unwrap().kind, TrItemKind::Pickup);
}

#[test]
fn cross_reference_lookup() {
    let list = xrefs();
    assert_eq!(list.xref_index(0.0, Direction::Forward), Some(0));
    assert_eq!(list.xref_index(150.0, Direction::Forward), Some(1));
    assert_eq!(list.xref_index(250.0, Direction::Forward), Some(2));
    assert_eq!(list.xref_index(350.0, Direction::Forward), Some(0));

    assert_eq!(list.xref_index(50.0, Direction::Backward), Some(2));
    assert_eq!(list.xref_index(150.0, Direction::Backward), Some(1));
    assert_eq!(list.xref_index(250.0, Direction::Backward), Some(0));
    assert_eq!(list.xref_index(350.0, Direction::Backward), Some(2));

    assert_eq!(list.section_index_at(150.0, Direction::Forward), Some(20));
    assert_eq!(list.get(2).unwrap().offset(Direction::Forward.reverse()), 0.0);
    assert_eq!(TrackCircuitXRefList::new().xref_index(10.0, Direction::Forward), None);
}

#[test]
fn cross_references_attach_to_vector_nodes() {
    let (mut db, _) = parse(TDB);
    assert!(db.attach_cross_references(2, xrefs()));
    assert!(!db.attach_cross_references(3, xrefs()));
    assert!(!db.attach_cross_references(40, xrefs()));
    assert_eq!(db.node(2).unwrap().cross_references.as_ref().map(|x| x.len()), Some(3));
}

#[test]
fn numbering_problems_warn() {
    let src = "TrackDB (
        TrackNodes ( 1
            TrackNode ( 5 TrEndNode ( 0 ) TrPins ( 1 0 TrPin ( 1 1 ) ) )
            TrackNode ( 2 TrEndNode ( 0 ) TrPins ( 1 0 TrPin ( 1 1 ) ) )
        )
        TrItemTable ( 2
            EmptyItem ( TrItemId ( 3 ) )
        )
    )";
    let (db, diag) = parse(src);
    assert_eq!(db.node_count(), 1);
    assert_eq!(db.node(1).unwrap().index, 1);
    assert!(diag.contains("Track node 1 is numbered 5"));
    assert!(diag.contains("Skipped extra TrackNode"));
    assert_eq!(db.items[0].id, 0);
    assert!(diag.contains("Track item 0 has mismatched TrItemID 3"));
    assert!(diag.contains("1 missing TrItem(s)"));
}

#[test]
fn missing_database() {
    let (db, diag) = parse("Other ( 1 )");
    assert_eq!(db.node_count(), 0);
    assert!(db.items.is_empty());
    assert!(diag.contains("Missing TrackDB in test.tdb"));
}

#[test]
fn written_database_reads_back() {
    let (db, _) = parse(TDB);
    let mut out: Vec<u8> = Vec::new();
    write_tdb(&db, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("SIMISA@@@@@@@@@@JINX0T0t______"));

    let (again, _) = parse(&text);
    assert_eq!(again.serial, db.serial);
    assert_eq!(again.nodes, db.nodes);
    let tags = |d: &TrackDB| d.items.iter().map(|i| (i.id, i.kind.tag())).collect::<Vec<_>>();
    assert_eq!(tags(&again), tags(&db));
    assert_eq!(again.items[0], db.items[0]);
    assert_eq!(again.items[2], db.items[2]);
}

#[test]
fn huge_declared_counts_only_warn() {
    let src = "TrackDB (
        TrackNodes ( 2000000000
            TrackNode ( 1 TrEndNode ( 0 ) TrPins ( 1 0 TrPin ( 1 1 ) ) )
        )
        TrItemTable ( 2000000000 )
    )";
    let (db, diag) = parse(src);
    assert_eq!(db.node_count(), 1);
    assert!(db.node(1).unwrap().is_end());
    assert!(db.items.is_empty());
    assert!(diag.contains("1999999999 missing TrackNode(s)"));
    assert!(diag.contains("2000000000 missing TrItem(s)"));
}

#[test]
fn written_database_keeps_numbering_across_gaps() {
    let (mut db, _) = parse(TDB);
    db.nodes[2] = None;
    let mut out: Vec<u8> = Vec::new();
    write_tdb(&db, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("TrackNodes ( 4\n"));

    let (again, diag) = parse(&text);
    assert!(!diag.contains("numbered"));
    assert_eq!(again.node_count(), 4);
    assert_eq!(again.node(2).unwrap().kind, NodeKind::Unclassified);
    assert_eq!(again.node(3), db.node(3));
    assert_eq!(again.node(4), db.node(4));
}
