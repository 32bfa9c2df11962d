use aci_snapshot::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub count: usize,
}

/// Class inventory of one snapshot, optionally with the DNs of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub total: usize,
    pub classes: Vec<ClassCount>,
    pub class: Option<String>,
    pub dns: Vec<String>,
}

pub fn build_inventory(snapshot: &Snapshot, class: Option<&str>) -> Inventory {
    Inventory {
        total: snapshot.len(),
        classes: snapshot
            .class_counts()
            .into_iter()
            .map(|(class, count)| ClassCount {
                class: class.to_string(),
                count,
            })
            .collect(),
        class: class.map(str::to_string),
        dns: class
            .map(|class| snapshot.get(class).iter().map(|o| o.dn.clone()).collect())
            .unwrap_or_default(),
    }
}

pub fn render_inventory_text(inventory: &Inventory) -> String {
    let mut out = vec![format!(
        "objects={} classes={}",
        inventory.total,
        inventory.classes.len()
    )];
    for row in &inventory.classes {
        out.push(format!("- {}: {}", row.class, row.count));
    }
    if let Some(class) = &inventory.class {
        out.push(String::new());
        out.push(format!("{class} dns={}", inventory.dns.len()));
        for dn in &inventory.dns {
            out.push(format!("  {dn}"));
        }
    }
    out.join("\n")
}
