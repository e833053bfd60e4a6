use std::collections::BTreeMap;

use super::{OptionCatalog, OptionEntry};

const WORK_LOCATIONS: &[(&str, &str)] = &[
    ("old_debugging", "老调试"),
    ("new_debugging", "新调试"),
    ("assembly_workshop", "总装车间"),
    ("painting_workshop", "涂装车间"),
    ("test_line", "试验线"),
    ("warehouse", "库房"),
];

const WORK_TYPES: &[(&str, &str)] = &[
    ("quality_rework", "质量返工"),
    ("product_work", "产品作业"),
    ("equipment_maintenance", "设备维修"),
    ("construction", "施工作业"),
    ("other", "其他"),
];

const QUALITY_REWORK_CONTENTS: &[(&str, &str)] = &[
    ("ncr_rework", "NCR返工"),
    ("design_change_rework", "设计变更返工"),
    ("nonconformity_rework", "不合格品返工"),
];

const PRODUCT_WORK_CONTENTS: &[(&str, &str)] = &[
    ("debugging", "调试作业"),
    ("installation", "安装作业"),
    ("inspection", "检验作业"),
];

const MAINTENANCE_CONTENTS: &[(&str, &str)] = &[
    ("routine_repair", "设备检修"),
    ("overhaul", "设备大修"),
];

const CONSTRUCTION_CONTENTS: &[(&str, &str)] = &[
    ("civil_works", "土建施工"),
    ("pipeline", "管线施工"),
];

const OTHER_CONTENTS: &[(&str, &str)] = &[("other", "其他作业")];

const HAZARD_TYPES: &[(&str, &str)] = &[
    ("high_altitude", "登高作业"),
    ("hot_work", "动火作业"),
    ("confined_space", "受限空间作业"),
    ("temporary_power", "临时用电"),
    ("lifting", "起重吊装"),
    ("live_electrical", "带电作业"),
    ("hazardous_chemicals", "危化品作业"),
    ("none", "无"),
];

const WORK_BASES: &[(&str, &str)] = &[
    ("ncr", "NCR"),
    ("design_change", "设计变更"),
    ("nonconformity", "不合格品报告"),
];

fn entries(pairs: &[(&str, &str)]) -> Vec<OptionEntry> {
    pairs
        .iter()
        .map(|(value, label)| OptionEntry::new(*value, *label))
        .collect()
}

/// Built-in option sets shipped with the service.
pub(super) fn standard_catalog() -> OptionCatalog {
    let mut work_contents = BTreeMap::new();
    work_contents.insert("quality_rework".to_string(), entries(QUALITY_REWORK_CONTENTS));
    work_contents.insert("product_work".to_string(), entries(PRODUCT_WORK_CONTENTS));
    work_contents.insert(
        "equipment_maintenance".to_string(),
        entries(MAINTENANCE_CONTENTS),
    );
    work_contents.insert("construction".to_string(), entries(CONSTRUCTION_CONTENTS));
    work_contents.insert("other".to_string(), entries(OTHER_CONTENTS));

    OptionCatalog {
        work_locations: entries(WORK_LOCATIONS),
        work_types: entries(WORK_TYPES),
        work_contents,
        hazard_types: entries(HAZARD_TYPES),
        work_bases: entries(WORK_BASES),
    }
}
