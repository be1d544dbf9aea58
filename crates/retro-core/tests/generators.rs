#![allow(dead_code)]

use chrono::NaiveDate;
use proptest::prelude::*;
use retro_core::model::{Attendee, RbtItem, Retrospective};

pub fn arb_word() -> impl Strategy<Value = String> {
    "[a-zA-Z]{1,8}"
}

pub fn arb_item(prefix: &'static str) -> impl Strategy<Value = RbtItem> {
    (any::<u32>(), arb_word(), prop::collection::vec(arb_word(), 0..3))
        .prop_map(move |(n, text, tags)| {
            RbtItem::new(format!("{prefix}-{n}"), text, "ana").with_tags(tags)
        })
}

pub fn arb_items(prefix: &'static str) -> impl Strategy<Value = Vec<RbtItem>> {
    prop::collection::vec(arb_item(prefix), 0..4)
}

pub fn arb_retro(id: String) -> impl Strategy<Value = Retrospective> {
    (
        arb_word(),
        prop::collection::vec(arb_word(), 0..3),
        arb_items("r"),
        arb_items("b"),
        arb_items("t"),
        1u32..28,
    )
        .prop_map(move |(title, attendees, roses, buds, thorns, day)| {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).expect("day in range");
            let mut retro = Retrospective::new(id.clone(), "ana", title, date);
            retro.attendees = attendees.into_iter().map(Attendee::named).collect();
            retro.roses = roses;
            retro.buds = buds;
            retro.thorns = thorns;
            retro
        })
}

/// A flat list of retrospectives whose parent pointers may reference each
/// other, unknown ids, or form cycles.
pub fn arb_forest() -> impl Strategy<Value = Vec<Retrospective>> {
    (1usize..12).prop_flat_map(|n| {
        let retros: Vec<_> = (0..n).map(|i| arb_retro(format!("n{i}"))).collect();
        let parents = prop::collection::vec(prop::option::of(0usize..n + 2), n);
        (retros, parents).prop_map(|(mut retros, parents)| {
            for (retro, parent) in retros.iter_mut().zip(parents) {
                retro.parent_id = parent.map(|p| format!("n{p}"));
            }
            retros
        })
    })
}
