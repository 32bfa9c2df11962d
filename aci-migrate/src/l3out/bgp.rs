use aci_snapshot::dn::{self, PathEndpoint};
use aci_snapshot::{NetworkObject, ObjectIndex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Ebgp,
    Ibgp,
    Unknown,
}

impl SessionType {
    /// Equal AS numbers make an iBGP session. A missing side stays unknown.
    pub fn classify(local_as: Option<u32>, remote_as: Option<u32>) -> Self {
        match (local_as, remote_as) {
            (Some(local), Some(remote)) if local == remote => SessionType::Ibgp,
            (Some(_), Some(_)) => SessionType::Ebgp,
            _ => SessionType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Ebgp => "eBGP",
            SessionType::Ibgp => "iBGP",
            SessionType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpPeer {
    pub dn: String,
    pub address: String,
    pub remote_as: Option<u32>,
    pub local_as: Option<u32>,
    pub session: SessionType,
    pub node: Option<u32>,
    pub admin_state: Option<String>,
    pub password_configured: bool,
}

/// AS number attribute. Zero and asdot notation resolve to `None`.
pub fn asn(object: &NetworkObject, key: &str) -> Option<u32> {
    object
        .int(key)
        .and_then(|asn| u32::try_from(asn).ok())
        .filter(|asn| *asn > 0)
}

/// Fabric AS from the `bgpAsP` under the fabric BGP instance policy.
pub fn fabric_asn(index: &ObjectIndex<'_>) -> Option<u32> {
    index
        .get("bgpAsP")
        .iter()
        .filter(|as_p| as_p.dn.starts_with("uni/fabric/bgpInstP-"))
        .find_map(|as_p| asn(as_p, "asn"))
}

/// Every `bgpPeerP` below one L3Out.
pub fn peers(index: &ObjectIndex<'_>, l3out_dn: &str, fabric_as: Option<u32>) -> Vec<BgpPeer> {
    index
        .descendants(l3out_dn, "bgpPeerP")
        .into_iter()
        .map(|peer| {
            let remote_as = index
                .first_child(&peer.dn, "bgpAsP")
                .and_then(|as_p| asn(as_p, "asn"))
                .or_else(|| asn(peer, "asn"));
            let local_as = index
                .first_child(&peer.dn, "bgpLocalAsnP")
                .and_then(|local| asn(local, "localAsn"))
                .or(fabric_as);
            BgpPeer {
                dn: peer.dn.clone(),
                address: peer
                    .attr("addr")
                    .map(str::to_string)
                    .or_else(|| dn::segment(&peer.dn, "peerP-").map(str::to_string))
                    .unwrap_or_default(),
                session: SessionType::classify(local_as, remote_as),
                remote_as,
                local_as,
                node: peer_node(&peer.dn),
                admin_state: peer.attr("adminSt").map(str::to_string),
                password_configured: peer.attr("password").is_some_and(|p| !p.is_empty()),
            }
        })
        .collect()
}

/// Leaf of an interface-scoped peer, from the enclosing path relation.
fn peer_node(peer_dn: &str) -> Option<u32> {
    dn::segment(peer_dn, "rspathL3OutAtt-")
        .and_then(PathEndpoint::parse)
        .and_then(|path| path.nodes.first().copied())
        .or_else(|| dn::segment(peer_dn, "rsnodeL3OutAtt-").and_then(dn::node_id))
}

#[cfg(test)]
mod tests {
    use aci_snapshot::{NetworkObject, ObjectIndex, Snapshot};

    use super::*;

    #[test]
    fn classifies_by_as_comparison() {
        assert_eq!(SessionType::classify(Some(65000), Some(65000)), SessionType::Ibgp);
        assert_eq!(SessionType::classify(Some(65000), Some(65100)), SessionType::Ebgp);
        assert_eq!(SessionType::classify(None, Some(65100)), SessionType::Unknown);
        assert_eq!(SessionType::classify(Some(65000), None), SessionType::Unknown);
    }

    #[test]
    fn peer_overrides_take_precedence() {
        let peer_dn = concat!(
            "uni/tn-prod/out-wan/lnodep-border/lifp-if/",
            "rspathL3OutAtt-[topology/pod-1/paths-201/pathep-[eth1/1]]/peerP-[10.0.0.1]"
        );
        let snapshot = Snapshot::new()
            .with(
                NetworkObject::new("bgpAsP", "uni/fabric/bgpInstP-default/as")
                    .with_attr("asn", "65000"),
            )
            .with(NetworkObject::new("bgpPeerP", peer_dn).with_attr("addr", "10.0.0.1"))
            .with(NetworkObject::new("bgpAsP", format!("{peer_dn}/as")).with_attr("asn", "65100"))
            .with(
                NetworkObject::new("bgpLocalAsnP", format!("{peer_dn}/localasn"))
                    .with_attr("localAsn", "65100"),
            );
        let index = ObjectIndex::new(&snapshot);
        let fabric = fabric_asn(&index);
        assert_eq!(fabric, Some(65000));

        let peers = peers(&index, "uni/tn-prod/out-wan", fabric);
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].remote_as, Some(65100));
        assert_eq!(peers[0].local_as, Some(65100));
        assert_eq!(peers[0].session, SessionType::Ibgp);
        assert_eq!(peers[0].node, Some(201));
    }
}
