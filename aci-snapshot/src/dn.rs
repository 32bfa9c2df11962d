//! Distinguished-name helpers.
//!
//! ACI DNs are `/`-separated relative names, but a relative name may embed
//! slashes inside square brackets (`phys-[eth1/1]`, `pathep-[eth1/12]`), so
//! every split here is bracket-aware.

use serde::Serialize;

/// Split a DN into its relative names.
pub fn split_rns(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in dn.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if idx > start {
                    parts.push(&dn[start..idx]);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < dn.len() {
        parts.push(&dn[start..]);
    }
    parts
}

/// DN of the parent object, or `None` for a single-rn DN.
pub fn parent_dn(dn: &str) -> Option<&str> {
    last_separator(dn).map(|idx| &dn[..idx])
}

/// Last relative name of a DN.
pub fn rn(dn: &str) -> &str {
    match last_separator(dn) {
        Some(idx) => &dn[idx + 1..],
        None => dn,
    }
}

fn last_separator(dn: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut last = None;
    for (idx, ch) in dn.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => last = Some(idx),
            _ => {}
        }
    }
    last
}

/// True when `dn` lies strictly below `ancestor`.
pub fn is_descendant(dn: &str, ancestor: &str) -> bool {
    dn.len() > ancestor.len() + 1
        && dn.starts_with(ancestor)
        && dn.as_bytes()[ancestor.len()] == b'/'
}

/// Value of the first relative name starting with `prefix`, brackets stripped.
///
/// `segment("uni/tn-prod/out-wan", "out-")` is `Some("wan")`.
pub fn segment<'a>(dn: &'a str, prefix: &str) -> Option<&'a str> {
    split_rns(dn)
        .into_iter()
        .find_map(|part| part.strip_prefix(prefix))
        .map(strip_brackets)
}

fn strip_brackets(value: &str) -> &str {
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value)
}

pub fn tenant(dn: &str) -> Option<&str> {
    segment(dn, "tn-")
}

pub fn l3out(dn: &str) -> Option<&str> {
    segment(dn, "out-")
}

pub fn epg(dn: &str) -> Option<&str> {
    segment(dn, "epg-")
}

/// Numeric id from a `node-<id>` relative name.
pub fn node_id(dn: &str) -> Option<u32> {
    segment(dn, "node-").and_then(|id| id.parse().ok())
}

/// Interface id from a `phys-[..]` or `aggr-[..]` relative name.
pub fn interface_id(dn: &str) -> Option<&str> {
    segment(dn, "phys-").or_else(|| segment(dn, "aggr-"))
}

/// Whether a path endpoint targets one leaf or a VPC leaf pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathKind {
    Single,
    Protected,
}

/// Decoded `topology/pod-N/(prot)paths-../pathep-[..]` target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEndpoint {
    pub pod: Option<u32>,
    pub nodes: Vec<u32>,
    pub fex: Option<u32>,
    pub interface: String,
    pub kind: PathKind,
}

impl PathEndpoint {
    /// Decode a path attachment target DN.
    pub fn parse(tdn: &str) -> Option<Self> {
        let mut pod = None;
        let mut nodes = Vec::new();
        let mut fex = None;
        let mut interface = None;
        let mut kind = PathKind::Single;

        for part in split_rns(tdn) {
            if let Some(id) = part.strip_prefix("pod-") {
                pod = id.parse().ok();
            } else if let Some(ids) = part.strip_prefix("protpaths-") {
                kind = PathKind::Protected;
                nodes = ids.split('-').filter_map(|id| id.parse().ok()).collect();
            } else if let Some(id) = part.strip_prefix("paths-") {
                nodes = id.parse().ok().into_iter().collect();
            } else if let Some(id) = part.strip_prefix("extpaths-") {
                fex = id.parse().ok();
            } else if let Some(name) = part.strip_prefix("pathep-") {
                interface = Some(strip_brackets(name).to_string());
            }
        }

        if nodes.is_empty() {
            return None;
        }
        Some(Self {
            pod,
            nodes,
            fex,
            interface: interface?,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_bracketed_slashes() {
        assert_eq!(
            split_rns("topology/pod-1/node-101/sys/phys-[eth1/1]"),
            vec!["topology", "pod-1", "node-101", "sys", "phys-[eth1/1]"]
        );
    }

    #[test]
    fn parent_and_rn_respect_brackets() {
        let dn = "topology/pod-1/node-101/sys/phys-[eth1/1]/phys";
        assert_eq!(
            parent_dn(dn),
            Some("topology/pod-1/node-101/sys/phys-[eth1/1]")
        );
        assert_eq!(rn("topology/pod-1/node-101/sys/phys-[eth1/1]"), "phys-[eth1/1]");
        assert_eq!(parent_dn("uni"), None);
    }

    #[test]
    fn descendant_check_requires_separator() {
        assert!(is_descendant("uni/tn-a/brc-web", "uni/tn-a"));
        assert!(!is_descendant("uni/tn-ab/brc-web", "uni/tn-a"));
        assert!(!is_descendant("uni/tn-a", "uni/tn-a"));
    }

    #[test]
    fn extracts_named_segments() {
        let dn = "uni/tn-prod/out-wan/lnodep-border/rsnodeL3OutAtt-[topology/pod-1/node-201]";
        assert_eq!(tenant(dn), Some("prod"));
        assert_eq!(l3out(dn), Some("wan"));
        assert_eq!(epg("uni/tn-prod/ap-app/epg-web/rspathAtt-[x]"), Some("web"));
        assert_eq!(node_id("topology/pod-1/node-201"), Some(201));
        assert_eq!(interface_id("topology/pod-1/node-101/sys/aggr-[po10]"), Some("po10"));
    }

    #[test]
    fn decodes_protected_paths() {
        let path = PathEndpoint::parse("topology/pod-1/protpaths-101-102/pathep-[vpc_web]")
            .expect("protpaths");
        assert_eq!(path.kind, PathKind::Protected);
        assert_eq!(path.nodes, vec![101, 102]);
        assert_eq!(path.interface, "vpc_web");
    }

    #[test]
    fn decodes_fex_paths() {
        let path = PathEndpoint::parse("topology/pod-1/paths-101/extpaths-110/pathep-[eth1/5]")
            .expect("fex path");
        assert_eq!(path.kind, PathKind::Single);
        assert_eq!(path.fex, Some(110));
        assert_eq!(path.interface, "eth1/5");
        assert!(PathEndpoint::parse("uni/tn-a").is_none());
    }
}
