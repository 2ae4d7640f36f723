#![no_main]
use libfuzzer_sys::fuzz_target;
use tomoyo_cond::condition::{parse, GroupRegistry};

// Any text either fails to parse or round-trips through Display

fuzz_target!(|data: &[u8]| {
    let Ok(expr) = std::str::from_utf8(data) else {
        return;
    };

    let groups = GroupRegistry::new();
    groups.define_literals("fuzz", &["0", "100-200"]).ok();

    if let Ok(cond) = parse(expr, &groups) {
        let text = cond.to_string();
        let reparsed = parse(&text, &groups).expect("display output must parse");
        assert_eq!(reparsed.to_string(), text);
    }
});
