//! Shared fixtures for service tests: the canonical six-node overlay and a
//! server handle for an arbitrary member.

use std::sync::Arc;

use figment::{
	Figment,
	providers::{Format, Toml},
};
use queryfan_core::{Config, NodeId, Server, proto::Row};
use serde_json::json;

pub(crate) const OVERLAY: &str = r#"
[strategies]
forwarding = "round_robin"
chunking = "fixed"
fairness = "strict"

[processes.A]
id = "A"
role = "leader"
team = "green"
host = "127.0.0.1"
port = 7001
neighbors = ["B", "E"]

[processes.B]
id = "B"
role = "team_leader"
team = "green"
host = "127.0.0.1"
port = 7002
neighbors = ["A", "C", "D"]

[processes.C]
id = "C"
role = "worker"
team = "green"
host = "127.0.0.1"
port = 7003
neighbors = ["B"]
date_bounds = [20240101, 20240331]

[processes.D]
id = "D"
role = "worker"
team = "pink"
host = "127.0.0.1"
port = 7004
neighbors = ["B", "E"]
date_bounds = [20240701, 20240930]

[processes.E]
id = "E"
role = "team_leader"
team = "pink"
host = "127.0.0.1"
port = 7005
neighbors = ["A", "D", "F"]

[processes.F]
id = "F"
role = "worker"
team = "pink"
host = "127.0.0.1"
port = 7006
neighbors = ["E"]
date_bounds = [20241001, 20241231]
"#;

pub(crate) fn config() -> Config {
	let config: Config = Figment::from(Toml::string(OVERLAY))
		.extract()
		.expect("overlay fixture parses");
	config.check().expect("overlay fixture is valid");

	config
}

pub(crate) fn node(c: char) -> NodeId { c.to_string().parse().expect("valid node id") }

pub(crate) fn server(id: char) -> Arc<Server> {
	Arc::new(Server::new(node(id), config(), None).expect("server builds"))
}

pub(crate) fn row(pm25: f64, station: &str) -> Row {
	let mut row = Row::new();
	row.insert("PM2.5".to_owned(), json!(pm25));
	row.insert("station".to_owned(), json!(station));

	row
}
