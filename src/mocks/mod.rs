//! Mock implementations for testing.
//!
//! Hand-written doubles for the transport and auth seams, plus canned
//! network API documents in both interface formats.

mod auth;
mod transport;

pub use auth::MockAuthProvider;
pub use transport::{MockResponse, MockTransport};

use serde_json::json;

/// Canned response bodies.
pub struct TestFixtures;

impl TestFixtures {
    /// JSON document for one security group.
    pub fn security_group_json(id: &str, name: &str) -> String {
        json!({
            "security_group": {
                "id": id,
                "name": name,
                "description": "",
                "tenant_id": "tenant-1",
                "security_group_rules": [],
            }
        })
        .to_string()
    }

    /// XML document for one security group.
    pub fn security_group_xml(id: &str, name: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<security_group xmlns="http://openstack.org/quantum/api/v2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <id>{}</id>
    <name>{}</name>
    <description></description>
    <tenant_id>tenant-1</tenant_id>
    <security_group_rules/>
</security_group>"#,
            id, name
        )
    }

    /// JSON listing containing the tenant's `default` group and `extra`.
    pub fn security_groups_json(extra: &[(&str, &str)]) -> String {
        let mut groups = vec![json!({"id": "default-id", "name": "default", "description": "default"})];
        groups.extend(
            extra
                .iter()
                .map(|(id, name)| json!({"id": id, "name": name, "description": ""})),
        );
        json!({ "security_groups": groups }).to_string()
    }

    /// XML listing containing only the tenant's `default` group.
    pub fn security_groups_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<security_groups xmlns="http://openstack.org/quantum/api/v2.0">
    <security_group>
        <id>default-id</id>
        <name>default</name>
        <description>default</description>
    </security_group>
</security_groups>"#
    }

    /// JSON document for one rule.
    pub fn security_group_rule_json(id: &str, group_id: &str, protocol: &str) -> String {
        json!({
            "security_group_rule": {
                "id": id,
                "security_group_id": group_id,
                "direction": "ingress",
                "protocol": protocol,
                "ethertype": "IPv4",
                "port_range_min": null,
                "port_range_max": null,
                "remote_ip_prefix": null,
                "remote_group_id": null,
                "tenant_id": "tenant-1",
            }
        })
        .to_string()
    }

    /// XML document for one rule with a port range.
    pub fn security_group_rule_xml(
        id: &str,
        group_id: &str,
        port_min: u16,
        port_max: u16,
    ) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<security_group_rule xmlns="http://openstack.org/quantum/api/v2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <id>{}</id>
    <security_group_id>{}</security_group_id>
    <direction>ingress</direction>
    <protocol>tcp</protocol>
    <ethertype>IPv4</ethertype>
    <port_range_min>{}</port_range_min>
    <port_range_max>{}</port_range_max>
    <remote_ip_prefix xsi:nil="true"/>
    <remote_group_id xsi:nil="true"/>
</security_group_rule>"#,
            id, group_id, port_min, port_max
        )
    }

    /// Capability document returned by `GET /info`.
    pub fn swift_info_json() -> &'static str {
        r#"{"swift": {"version": "1.10.0", "max_file_size": 5368709122}, "bulk_delete": {"max_deletes_per_request": 10000}}"#
    }
}
