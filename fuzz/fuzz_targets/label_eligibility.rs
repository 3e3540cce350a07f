#![no_main]

use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use lgrcore::{AddOptions, EntryInput, Lgr, TableDatabase, VariantInput};

/// Small a-f repertoire with two variant sets.
static LGR: LazyLock<Lgr> = LazyLock::new(|| {
    let mut lgr = Lgr::new(Arc::new(TableDatabase::new()));
    let opts = AddOptions::forced();
    for cp in 0x61..=0x66 {
        let _ = lgr.add_cp(EntryInput::new(&[cp]), &opts);
    }
    for (a, b) in [(0x61, 0x62), (0x63, 0x64), (0x64, 0x65)] {
        let _ = lgr.add_variant(&[a], VariantInput::new(&[b], Some("blocked")), &opts);
    }
    lgr.populate_variants();
    lgr
});

fuzz_target!(|data: &[u8]| {
    // Fold bytes onto a-g so most labels hit the repertoire.
    let label: Vec<u32> = data.iter().take(16).map(|b| 0x61 + u32::from(b % 7)).collect();
    let Ok(report) = LGR.test_label_eligible(&label) else {
        return;
    };
    if !report.eligible {
        return;
    }
    let index = LGR.generate_index_label(&label).ok();
    for variant in LGR.generate_label_variants(&label, false).take(256) {
        let Ok(variant) = variant else { break };
        assert_eq!(LGR.generate_index_label(&variant.cp).ok(), index);
    }
});
