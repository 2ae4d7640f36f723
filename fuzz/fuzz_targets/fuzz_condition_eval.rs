#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use tomoyo_cond::condition::{
    parse, GroupRegistry, MiniStat, ObjectInfo, RequestInfo, StaticPathNode, TaskCredentials,
};

#[derive(Arbitrary, Debug)]
struct Input {
    expr: String,
    uid: u32,
    gid: u32,
    file_uid: u32,
    file_mode: u32,
    has_path1: bool,
    has_parent: bool,
}

// Evaluation must be deterministic across repeated checks of one request

fuzz_target!(|input: Input| {
    let Ok(cond) = parse(&input.expr, &GroupRegistry::new()) else {
        return;
    };

    let mut request = RequestInfo::new(TaskCredentials::with_ids(input.uid, input.gid));
    if input.has_path1 {
        let mut node = StaticPathNode::new(MiniStat {
            uid: input.file_uid,
            mode: input.file_mode,
            ..MiniStat::default()
        });
        if input.has_parent {
            node = node.with_parent(StaticPathNode::new(MiniStat::default()));
        }
        request = request.with_object(ObjectInfo::new().with_path1(Arc::new(node)));
    }

    let first = cond.matches(&mut request);
    let second = cond.matches(&mut request);
    assert_eq!(first, second);
});
