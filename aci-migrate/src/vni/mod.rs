//! EVPN segment mapping.
//!
//! Each VRF (`fvCtx`) gets an L3 VNI and each bridge domain (`fvBD`) gets an
//! L2 VNI plus a fabric VLAN. Allocation walks the objects in DN order from
//! the configured starts, so one snapshot always maps to the same numbers.
//! EPGs inherit the VLAN and VNI of the bridge domain they bind to.

pub mod templates;

use std::collections::BTreeSet;

use aci_snapshot::{dn, NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::issue::{warning, Finding};
use crate::settings::VniSettings;

/// Largest value of the 24-bit VXLAN network identifier.
pub const MAX_VNI: u32 = 16_777_215;
const MAX_VLAN: u32 = 4094;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct L3Vni {
    pub tenant: String,
    pub vrf: String,
    pub dn: String,
    pub vni: u32,
    pub route_target: String,
}

impl L3Vni {
    /// `tenant-vrf`, matching the VRF names in the border templates.
    pub fn label(&self) -> String {
        format!("{}-{}", self.tenant, self.vrf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySubnet {
    pub ip: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct L2Vni {
    pub tenant: String,
    pub bd: String,
    pub dn: String,
    pub vlan: Option<u16>,
    pub vni: Option<u32>,
    /// Label of the resolved VRF.
    pub vrf: Option<String>,
    pub l3_vni: Option<u32>,
    pub subnets: Vec<GatewaySubnet>,
    pub arp_suppression: bool,
}

impl L2Vni {
    pub fn label(&self) -> String {
        format!("{}-{}", self.tenant, self.bd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpgVlan {
    pub dn: String,
    pub tenant: String,
    pub epg: String,
    pub bd: Option<String>,
    pub vlan: Option<u16>,
    pub vni: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VniMapping {
    pub l3: Vec<L3Vni>,
    pub l2: Vec<L2Vni>,
    pub epgs: Vec<EpgVlan>,
    pub findings: Vec<Finding>,
}

impl VniMapping {
    /// L3 VNI of a VRF referenced from `tenant`, falling back to `common`.
    pub fn l3_for(&self, tenant: &str, vrf: &str) -> Option<&L3Vni> {
        let in_tenant = |t: &str| self.l3.iter().find(|l3| l3.tenant == t && l3.vrf == vrf);
        in_tenant(tenant).or_else(|| in_tenant("common"))
    }

    pub fn epg(&self, dn: &str) -> Option<&EpgVlan> {
        self.epgs.iter().find(|epg| epg.dn == dn)
    }
}

/// Allocate VNIs and VLANs for every VRF, bridge domain and EPG.
pub fn map(index: &ObjectIndex<'_>, settings: &VniSettings) -> VniMapping {
    let mut findings = Vec::new();

    let mut l3 = Vec::new();
    for (offset, ctx) in sorted(index.get("fvCtx")).into_iter().enumerate() {
        let Some(vni) = offset_from(settings.l3_start, offset).filter(|v| *v <= MAX_VNI) else {
            findings.push(warning(
                "vni_exhausted",
                &ctx.dn,
                format!("no L3 VNI left above {} for vrf {}", settings.l3_start, ctx.name()),
            ));
            continue;
        };
        l3.push(L3Vni {
            tenant: dn::tenant(&ctx.dn).unwrap_or("common").to_string(),
            vrf: ctx.name().to_string(),
            dn: ctx.dn.clone(),
            vni,
            route_target: format!("{vni}:{vni}"),
        });
    }

    let taken: BTreeSet<u32> = l3.iter().map(|l3| l3.vni).collect();
    let mut next_vni = Some(settings.l2_start);
    let mut l2 = Vec::new();
    for (offset, bd) in sorted(index.get("fvBD")).into_iter().enumerate() {
        let tenant = dn::tenant(&bd.dn).unwrap_or("common");

        let vni = loop {
            match next_vni {
                Some(candidate) if candidate > MAX_VNI => break None,
                Some(candidate) => {
                    next_vni = candidate.checked_add(1);
                    if !taken.contains(&candidate) {
                        break Some(candidate);
                    }
                }
                None => break None,
            }
        };
        if vni.is_none() {
            findings.push(warning(
                "vni_exhausted",
                &bd.dn,
                format!("no L2 VNI left above {} for bd {}", settings.l2_start, bd.name()),
            ));
        }

        let vlan = offset_from(u32::from(settings.vlan_start), offset)
            .filter(|v| *v <= MAX_VLAN)
            .and_then(|v| u16::try_from(v).ok());
        if vlan.is_none() {
            findings.push(warning(
                "vlan_exhausted",
                &bd.dn,
                format!("no VLAN left above {} for bd {}", settings.vlan_start, bd.name()),
            ));
        }

        let ctx_name = index
            .first_child(&bd.dn, "fvRsCtx")
            .and_then(|rel| rel.attr("tnFvCtxName"))
            .filter(|name| !name.is_empty());
        let vrf = ctx_name.and_then(|name| {
            l3.iter()
                .find(|l3| l3.tenant == tenant && l3.vrf == name)
                .or_else(|| l3.iter().find(|l3| l3.tenant == "common" && l3.vrf == name))
        });
        if vrf.is_none() {
            findings.push(warning(
                "bd_without_vrf",
                &bd.dn,
                match ctx_name {
                    Some(name) => format!("bd {} references missing vrf {name}", bd.name()),
                    None => format!("bd {} has no vrf relation", bd.name()),
                },
            ));
        }

        let subnets = index
            .children(&bd.dn, "fvSubnet")
            .into_iter()
            .filter_map(|subnet| {
                Some(GatewaySubnet {
                    ip: subnet.attr("ip")?.to_string(),
                    scope: subnet.attr("scope").unwrap_or("private").to_string(),
                })
            })
            .collect();

        l2.push(L2Vni {
            tenant: tenant.to_string(),
            bd: bd.name().to_string(),
            dn: bd.dn.clone(),
            vlan,
            vni,
            vrf: vrf.map(L3Vni::label),
            l3_vni: vrf.map(|l3| l3.vni),
            subnets,
            arp_suppression: bd.attr("arpFlood") != Some("yes"),
        });
    }

    let mut epgs = Vec::new();
    for epg in sorted(index.get("fvAEPg")) {
        let tenant = dn::tenant(&epg.dn).unwrap_or("common");
        let bd_name = index
            .first_child(&epg.dn, "fvRsBd")
            .and_then(|rel| rel.attr("tnFvBDName"))
            .filter(|name| !name.is_empty());
        let bd = bd_name.and_then(|name| {
            let local = format!("uni/tn-{tenant}/BD-{name}");
            let shared = format!("uni/tn-common/BD-{name}");
            l2.iter()
                .find(|bd| bd.dn == local)
                .or_else(|| l2.iter().find(|bd| bd.dn == shared))
        });
        if bd.is_none() {
            findings.push(warning(
                "epg_without_bd",
                &epg.dn,
                match bd_name {
                    Some(name) => format!("epg {} references missing bd {name}", epg.name()),
                    None => format!("epg {} has no bridge domain relation", epg.name()),
                },
            ));
        }
        epgs.push(EpgVlan {
            dn: epg.dn.clone(),
            tenant: tenant.to_string(),
            epg: epg.name().to_string(),
            bd: bd.map(L2Vni::label),
            vlan: bd.and_then(|bd| bd.vlan),
            vni: bd.and_then(|bd| bd.vni),
        });
    }

    debug!(findings = findings.len(), "vni mapping findings");
    info!(l3 = l3.len(), l2 = l2.len(), epgs = epgs.len(), "vni mapping complete");
    VniMapping {
        l3,
        l2,
        epgs,
        findings,
    }
}

fn sorted(objects: &[NetworkObject]) -> Vec<&NetworkObject> {
    let mut objects: Vec<&NetworkObject> = objects.iter().collect();
    objects.sort_by(|a, b| a.dn.cmp(&b.dn));
    objects
}

fn offset_from(start: u32, offset: usize) -> Option<u32> {
    u32::try_from(offset).ok().and_then(|o| start.checked_add(o))
}

#[cfg(test)]
mod tests {
    use aci_snapshot::Snapshot;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ctx(tenant: &str, name: &str) -> NetworkObject {
        NetworkObject::new("fvCtx", format!("uni/tn-{tenant}/ctx-{name}")).with_attr("name", name)
    }

    fn bd(tenant: &str, name: &str, vrf: &str) -> Vec<NetworkObject> {
        let dn = format!("uni/tn-{tenant}/BD-{name}");
        vec![
            NetworkObject::new("fvBD", dn.clone()).with_attr("name", name),
            NetworkObject::new("fvRsCtx", format!("{dn}/rsctx")).with_attr("tnFvCtxName", vrf),
        ]
    }

    fn epg(tenant: &str, name: &str, bd: &str) -> Vec<NetworkObject> {
        let dn = format!("uni/tn-{tenant}/ap-app/epg-{name}");
        vec![
            NetworkObject::new("fvAEPg", dn.clone()).with_attr("name", name),
            NetworkObject::new("fvRsBd", format!("{dn}/rsbd")).with_attr("tnFvBDName", bd),
        ]
    }

    fn snapshot(objects: Vec<NetworkObject>) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for object in objects {
            snapshot.push(object);
        }
        snapshot
    }

    #[test]
    fn allocates_in_dn_order_from_starts() {
        let mut objects = vec![ctx("prod", "vrf2"), ctx("prod", "vrf1")];
        objects.extend(bd("prod", "web", "vrf1"));
        objects.extend(bd("prod", "app", "vrf2"));
        objects.push(
            NetworkObject::new("fvSubnet", "uni/tn-prod/BD-web/subnet-[10.1.0.1/24]")
                .with_attr("ip", "10.1.0.1/24"),
        );
        let snapshot = snapshot(objects);
        let mapping = map(&ObjectIndex::new(&snapshot), &VniSettings::default());

        let l3: Vec<(&str, u32)> = mapping.l3.iter().map(|l| (l.vrf.as_str(), l.vni)).collect();
        assert_eq!(l3, vec![("vrf1", 50000), ("vrf2", 50001)]);
        assert_eq!(mapping.l3[0].route_target, "50000:50000");

        let app = &mapping.l2[0];
        assert_eq!((app.bd.as_str(), app.vni, app.vlan), ("app", Some(10000), Some(100)));
        assert_eq!(app.l3_vni, Some(50001));
        let web = &mapping.l2[1];
        assert_eq!((web.vni, web.vlan), (Some(10001), Some(101)));
        assert_eq!(web.vrf.as_deref(), Some("prod-vrf1"));
        assert_eq!(
            web.subnets,
            vec![GatewaySubnet {
                ip: "10.1.0.1/24".into(),
                scope: "private".into()
            }]
        );
        assert!(web.arp_suppression);
        assert!(mapping.findings.is_empty());
    }

    #[test]
    fn l2_allocation_skips_l3_vnis() {
        let mut objects = vec![ctx("prod", "vrf1")];
        objects.extend(bd("prod", "a", "vrf1"));
        objects.extend(bd("prod", "b", "vrf1"));
        let snapshot = snapshot(objects);
        let settings = VniSettings {
            l3_start: 10000,
            ..VniSettings::default()
        };
        let mapping = map(&ObjectIndex::new(&snapshot), &settings);
        let vnis: Vec<Option<u32>> = mapping.l2.iter().map(|bd| bd.vni).collect();
        assert_eq!(vnis, vec![Some(10001), Some(10002)]);
    }

    #[test]
    fn vlan_and_vni_exhaustion_are_reported() {
        let snapshot = snapshot([bd("prod", "a", "vrf1"), bd("prod", "b", "vrf1")].concat());
        let settings = VniSettings {
            l2_start: MAX_VNI,
            vlan_start: 4094,
            ..VniSettings::default()
        };
        let mapping = map(&ObjectIndex::new(&snapshot), &settings);

        assert_eq!(mapping.l2[0].vni, Some(MAX_VNI));
        assert_eq!(mapping.l2[0].vlan, Some(4094));
        assert_eq!((mapping.l2[1].vni, mapping.l2[1].vlan), (None, None));
        let codes: Vec<&str> = mapping.findings.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"vni_exhausted"));
        assert!(codes.contains(&"vlan_exhausted"));
        assert!(codes.contains(&"bd_without_vrf"));
    }

    #[test]
    fn epgs_inherit_bridge_domain_segments() {
        let mut objects = vec![ctx("common", "shared")];
        objects.extend(bd("common", "shared", "shared"));
        objects.extend(bd("prod", "web", "shared"));
        objects.extend(epg("prod", "web", "web"));
        objects.extend(epg("prod", "infra", "shared"));
        objects.extend(epg("prod", "orphan", "missing"));
        let snapshot = snapshot(objects);
        let mapping = map(&ObjectIndex::new(&snapshot), &VniSettings::default());

        let web = mapping.epg("uni/tn-prod/ap-app/epg-web").expect("web epg");
        assert_eq!(web.bd.as_deref(), Some("prod-web"));
        assert_eq!((web.vlan, web.vni), (Some(101), Some(10001)));

        let infra = mapping.epg("uni/tn-prod/ap-app/epg-infra").expect("infra epg");
        assert_eq!(infra.bd.as_deref(), Some("common-shared"));
        assert_eq!(mapping.l2[1].vrf.as_deref(), Some("common-shared"));

        let orphan = mapping.epg("uni/tn-prod/ap-app/epg-orphan").expect("orphan epg");
        assert_eq!(orphan.vlan, None);
        assert_eq!(mapping.findings.len(), 1);
        assert_eq!(mapping.findings[0].code, "epg_without_bd");
        assert_eq!(mapping.l3_for("prod", "shared").map(|l3| l3.vni), Some(50000));
    }

    #[test]
    fn flooding_bridge_domain_keeps_arp() {
        let mut objects = bd("prod", "legacy", "vrf1");
        objects[0] = objects[0].clone().with_attr("arpFlood", "yes");
        let snapshot = snapshot(objects);
        let mapping = map(&ObjectIndex::new(&snapshot), &VniSettings::default());
        assert!(!mapping.l2[0].arp_suppression);
        assert!(map(&ObjectIndex::new(&Snapshot::new()), &VniSettings::default())
            .l2
            .is_empty());
    }
}
