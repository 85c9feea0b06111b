//! End-to-end tests for instance compilation.
//!
//! Each test drives the public pipeline: parameters in, resolved
//! instance, rendered descriptor and resource graph out, then applies the
//! graph to an in-memory host where convergence matters.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::Path;

use tcinst_common::config::ProvisionConfig;
use tcinst_common::error::ProvisionError;
use tcinst_common::types::{Ensure, Mode, ServiceState};
use tcinst_graph::converge::{EntryKind, MemoryHost, converge};
use tcinst_graph::graph::ResourceGraph;
use tcinst_graph::node::{ResourceKind, ResourceNode, ResourceRef};
use tcinst_graph::params::InstanceParameters;
use tcinst_graph::template::ServerTemplate;
use tcinst_graph::{Compiler, compile};

const HOME: &str = "/home/someapp_account/tomcat6-someapp";

fn node<'a>(graph: &'a ResourceGraph, path: &str) -> &'a ResourceNode {
    graph
        .get(&ResourceRef::file(path))
        .unwrap_or_else(|| panic!("missing node {path}"))
}

fn someapp() -> InstanceParameters {
    InstanceParameters::new("someapp").account("someapp_account")
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn no_parameters_fails_with_account_error() {
    let err = compile(&InstanceParameters::new("someapp")).unwrap_err();
    assert!(matches!(err, ProvisionError::Validation { parameter: "account", .. }));
    assert!(err.to_string().contains("account must be set"));
}

// ── Default layout ───────────────────────────────────────────────────

#[test]
fn sysconfig_file_points_at_home() {
    let compiled = compile(&someapp()).expect("should compile");
    let sysconfig = node(&compiled.graph, "/etc/sysconfig/tomcat6-someapp");
    assert_eq!(sysconfig.kind, ResourceKind::TemplatedFile);
    assert!(!sysconfig.attributes.replace);
    assert_eq!(sysconfig.attributes.owner.as_deref(), Some("root"));
    assert_eq!(sysconfig.attributes.group.as_deref(), Some("root"));
    assert_eq!(sysconfig.attributes.mode, Some(Mode::new(0o444)));
    let content = sysconfig.attributes.content.as_deref().expect("content");
    assert!(content.contains("/home/someapp_account/tomcat6-someapp"), "got: {content}");
    assert!(content.contains("TOMCAT_USER=\"someapp_account\""), "got: {content}");
}

#[test]
fn init_link_and_service() {
    let compiled = compile(&someapp()).expect("should compile");
    let init = node(&compiled.graph, "/etc/init.d/tomcat6-someapp");
    assert_eq!(init.kind, ResourceKind::Symlink);
    assert_eq!(init.attributes.target.as_deref(), Some(Path::new("/etc/init.d/tomcat6")));
    assert!(init.requires.contains(&ResourceRef::Package("tomcat6".into())));

    let service = compiled
        .graph
        .get(&ResourceRef::Service("tomcat6-someapp".into()))
        .expect("service");
    assert_eq!(service.attributes.enable, Some(true));
    assert_eq!(service.attributes.service_state, Some(ServiceState::Running));
    assert!(service.requires.contains(&ResourceRef::file("/etc/init.d/tomcat6-someapp")));
}

#[test]
fn application_directories() {
    let compiled = compile(&someapp()).expect("should compile");
    for dir in [
        HOME.to_string(),
        format!("{HOME}/conf/Catalina"),
        format!("{HOME}/webapps"),
        format!("{HOME}/lib"),
        "/var/log/tomcat6-someapp".to_string(),
        "/var/cache/tomcat6-someapp".to_string(),
    ] {
        let n = node(&compiled.graph, &dir);
        assert_eq!(n.kind, ResourceKind::Directory, "{dir}");
        assert_eq!(n.attributes.owner.as_deref(), Some("someapp_account"), "{dir}");
        assert_eq!(n.attributes.group.as_deref(), Some("someapp_account"), "{dir}");
        assert_eq!(n.attributes.mode, Some(Mode::new(0o2775)), "{dir}");
    }
}

#[test]
fn home_links() {
    let compiled = compile(&someapp()).expect("should compile");
    let cases = [
        ("logs", "/var/log/tomcat6-someapp"),
        ("bin", "/usr/share/tomcat6/bin"),
        ("temp", "/var/cache/tomcat6-someapp/temp"),
        ("work", "/var/cache/tomcat6-someapp/work"),
    ];
    for (link, target) in cases {
        let n = node(&compiled.graph, &format!("{HOME}/{link}"));
        assert_eq!(n.kind, ResourceKind::Symlink, "{link}");
        assert_eq!(n.attributes.target.as_deref(), Some(Path::new(target)), "{link}");
        assert_eq!(n.attributes.owner.as_deref(), Some("someapp_account"), "{link}");
        assert_eq!(n.attributes.mode, Some(Mode::new(0o2775)), "{link}");
    }
}

#[test]
fn conf_tree_and_config_file() {
    let compiled = compile(&someapp()).expect("should compile");
    let conf = node(&compiled.graph, &format!("{HOME}/conf"));
    assert!(!conf.attributes.replace);
    assert!(conf.attributes.recurse);
    assert!(!conf.attributes.purge);
    assert_eq!(conf.attributes.source.as_deref(), Some("puppet:///modules/tomcat6/app-home/"));
    assert_eq!(conf.attributes.mode, Some(Mode::new(0o644)));

    let config = node(&compiled.graph, &format!("{HOME}/conf/server.xml"));
    assert!(!config.attributes.replace);
    assert_eq!(config.attributes.owner.as_deref(), Some("someapp_account"));
    assert_eq!(config.attributes.mode, Some(Mode::new(0o644)));
    assert_eq!(config.attributes.content.as_deref(), Some(compiled.server_xml.as_str()));
}

#[test]
fn default_ports_in_descriptor() {
    let xml = compile(&someapp()).expect("should compile").server_xml;
    for line in [
        "<Server port=\"8005\" shutdown=\"SHUTDOWN\">\n",
        "<Connector port=\"8080\" protocol=\"HTTP/1.1\"\n",
        "redirectPort=\"8443\" />",
        "<!-- Define an AJP 1.3 Connector on port 8011 -->\n",
        "<Connector port=\"8011\" protocol=\"AJP/1.3\" redirectPort=\"8443\" />",
    ] {
        assert!(xml.contains(line), "missing {line:?}");
    }
}

// ── Overrides ────────────────────────────────────────────────────────

#[test]
fn port_overrides_in_descriptor() {
    let raw = InstanceParameters::new("someapp")
        .account("someapp_acct")
        .ajp_port("1111")
        .http_port("2222")
        .redirect_port("3333")
        .shutdown_port("4444");
    let compiled = compile(&raw).expect("should compile");
    let xml = &compiled.server_xml;
    for line in [
        "<Server port=\"4444\" shutdown=\"SHUTDOWN\">\n",
        "<Connector port=\"2222\" protocol=\"HTTP/1.1\"\n",
        "redirectPort=\"3333\" />",
        "<!-- Define an AJP 1.3 Connector on port 1111 -->\n",
        "<Connector port=\"1111\" protocol=\"AJP/1.3\" redirectPort=\"3333\" />",
    ] {
        assert!(xml.contains(line), "missing {line:?}");
    }
    for old in ["8005", "8080", "8443", "8011"] {
        assert!(!xml.contains(old), "default {old} left behind");
    }
    assert!(compiled.graph.get(&ResourceRef::file(
        "/home/someapp_acct/tomcat6-someapp/conf/server.xml"
    )).is_some());
}

#[test]
fn home_owner_and_group_override() {
    let raw = InstanceParameters::new("someapp")
        .account("someapp_acct")
        .home_owner("content_acct")
        .home_group("content_group");
    let compiled = compile(&raw).expect("should compile");
    for dir in [
        "/home/someapp_acct/tomcat6-someapp",
        "/home/someapp_acct/tomcat6-someapp/conf/Catalina",
        "/home/someapp_acct/tomcat6-someapp/lib",
        "/home/someapp_acct/tomcat6-someapp/webapps",
        "/var/cache/tomcat6-someapp",
        "/var/cache/tomcat6-someapp/work",
        "/var/cache/tomcat6-someapp/temp",
    ] {
        let n = node(&compiled.graph, dir);
        assert_eq!(n.kind, ResourceKind::Directory, "{dir}");
        assert_eq!(n.attributes.owner.as_deref(), Some("content_acct"), "{dir}");
        assert_eq!(n.attributes.group.as_deref(), Some("content_group"), "{dir}");
    }
    let home = Path::new("/home/someapp_acct/tomcat6-someapp");
    for n in compiled.graph.nodes().filter(|n| n.is_under(home)) {
        assert_eq!(n.attributes.owner.as_deref(), Some("content_acct"), "{}", n.id);
    }
}

// ── Graph properties ─────────────────────────────────────────────────

#[test]
fn compilation_is_deterministic() {
    let a = compile(&someapp()).expect("first");
    let b = compile(&someapp()).expect("second");
    assert_eq!(a, b);
    assert_eq!(
        a.graph.fingerprint().expect("hash"),
        b.graph.fingerprint().expect("hash")
    );
    let order_a: Vec<_> = a.graph.topological_order().expect("order").iter().map(|n| n.id.clone()).collect();
    let order_b: Vec<_> = b.graph.topological_order().expect("order").iter().map(|n| n.id.clone()).collect();
    assert_eq!(order_a, order_b);
}

#[test]
fn service_follows_init_link_and_home_comes_first() {
    let compiled = compile(&someapp()).expect("should compile");
    let order = compiled.graph.topological_order().expect("acyclic");
    let pos = |id: &ResourceRef| order.iter().position(|n| n.id == *id).expect("present");

    let init = ResourceRef::file("/etc/init.d/tomcat6-someapp");
    let service = ResourceRef::Service("tomcat6-someapp".into());
    assert!(pos(&init) < pos(&service));

    let home = ResourceRef::file(HOME);
    for n in compiled.graph.nodes().filter(|n| n.is_under(Path::new(HOME)) && n.id != home) {
        assert!(n.requires.contains(&home), "{} must require home", n.id);
        assert!(pos(&home) < pos(&n.id));
    }
}

#[test]
fn graph_round_trips_through_json() {
    let compiled = compile(&someapp()).expect("should compile");
    let json = serde_json::to_string_pretty(&compiled.graph).expect("serialize");
    let back: ResourceGraph = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, compiled.graph);
}

// ── Configuration ────────────────────────────────────────────────────

#[test]
fn custom_layout_and_template() {
    let dir = tempfile::tempdir().expect("temp dir");
    let template = dir.path().join("server.xml");
    std::fs::write(
        &template,
        "<Server port=\"{{shutdown_port}}\">{{http_port}}/{{redirect_port}}/{{ajp_port}}</Server>",
    )
    .expect("write");
    let config = ProvisionConfig {
        app_prefix: "tomcat7".into(),
        server_template: Some(template),
        ..ProvisionConfig::default()
    };
    let compiler = Compiler::new(config).expect("compiler");
    let compiled = compiler.compile(&someapp()).expect("should compile");
    assert_eq!(compiled.server_xml, "<Server port=\"8005\">8080/8443/8011</Server>");
    assert!(compiled.graph.get(&ResourceRef::Service("tomcat7-someapp".into())).is_some());
    assert_eq!(
        compiled.paths.home,
        Path::new("/home/someapp_account/tomcat7-someapp")
    );
}

#[test]
fn template_without_ajp_slot_is_rejected() {
    let err = ServerTemplate::parse("{{shutdown_port}}{{http_port}}{{redirect_port}}").unwrap_err();
    assert!(matches!(err, ProvisionError::Render { .. }));
}

// ── Convergence ──────────────────────────────────────────────────────

#[test]
fn reapplication_converges_and_preserves_edits() {
    let compiled = compile(&someapp()).expect("should compile");
    let mut host = MemoryHost::new()
        .with_package("tomcat6")
        .with_source("puppet:///modules/tomcat6/app-home/", [("web.xml", "<web-app/>")]);

    let first = converge(&compiled.graph, &mut host).expect("first pass");
    assert_eq!(first.changed().count(), compiled.graph.len());
    assert_eq!(
        host.service("tomcat6-someapp").map(|s| s.state),
        Some(ServiceState::Running)
    );

    let config_file = Path::new("/home/someapp_account/tomcat6-someapp/conf/server.xml");
    host.write_file(config_file, "<Server port=\"9005\"/>");
    host.write_file(Path::new("/etc/sysconfig/tomcat6-someapp"), "# operator");

    let second = converge(&compiled.graph, &mut host).expect("second pass");
    assert!(second.is_converged(), "{:?}", second.changed().collect::<Vec<_>>());
    assert_eq!(
        host.entry(config_file).map(|e| e.kind.clone()),
        Some(EntryKind::File {
            content: "<Server port=\"9005\"/>".into()
        })
    );
}

#[test]
fn stock_descriptor_in_conf_source_does_not_shadow_rendered_one() {
    let compiled = compile(&someapp().http_port(2222_u16)).expect("should compile");
    let mut host = MemoryHost::new().with_source(
        "puppet:///modules/tomcat6/app-home/",
        [
            ("server.xml", "<Server port=\"8005\"/> stock"),
            ("web.xml", "<web-app/>"),
        ],
    );

    let first = converge(&compiled.graph, &mut host).expect("first pass");
    assert!(!first.is_converged());
    let descriptor = Path::new(HOME).join("conf/server.xml");
    let Some(EntryKind::File { content }) = host.entry(&descriptor).map(|e| e.kind.clone()) else {
        panic!("descriptor missing on host");
    };
    assert!(content.contains("port=\"2222\""), "got: {content}");
    assert!(!content.contains("stock"), "got: {content}");
    assert!(host.entry(&Path::new(HOME).join("conf/web.xml")).is_some());

    let second = converge(&compiled.graph, &mut host).expect("second pass");
    assert!(second.is_converged(), "{:?}", second.changed().collect::<Vec<_>>());
}

#[test]
fn absent_instance_tears_down() {
    let present = compile(&someapp()).expect("present");
    let absent = compile(&someapp().ensure(Ensure::Absent)).expect("absent");
    assert_eq!(present.graph.len(), absent.graph.len());

    let mut host = MemoryHost::new();
    let _ = converge(&present.graph, &mut host).expect("create");
    let report = converge(&absent.graph, &mut host).expect("remove");
    assert!(!report.is_converged());
    assert!(host.service("tomcat6-someapp").is_none());
    assert!(host.entry(Path::new(HOME)).is_none());
    assert!(host.entry(Path::new("/var/log/tomcat6-someapp")).is_none());

    let again = converge(&absent.graph, &mut host).expect("remove again");
    assert!(again.is_converged());
}
