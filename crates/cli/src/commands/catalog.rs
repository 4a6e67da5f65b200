//! `promptmaster models` and `promptmaster tags`.

use promptmaster_core::TargetModel;
use promptmaster_core::catalog;

pub fn models() {
    println!("Target models");
    println!("=============");
    for model in TargetModel::all() {
        let profile = model.profile();
        let cap = profile
            .max_chars
            .map(|max| format!(" (max {max} chars)"))
            .unwrap_or_default();
        println!("  {:<12} {}{cap}", profile.id, profile.display_name);
        println!("  {:<12} {}", "", profile.guidance);
    }
}

pub fn tags() {
    println!("Style tags");
    println!("==========");
    for tag in catalog::catalog() {
        println!("  {:<14} {}", tag.id, tag.label);
    }
}
