//! End-to-end scenarios driving a real `Framework::run` over a real TCP
//! socket, and a Tool/Agent pair sharing an in-process registry.

use meshkit_config::{Config, Options};
use meshkit_gateway::Framework;
use meshkit_registry::{Discovery, InMemoryRegistry, Registry, ServiceFilter};
use meshkit_runtime::{Agent, BaseAgent, BaseTool, Collaborators, Tool};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

fn config(name: &str, port: u16) -> Config {
    Config::defaults().with_name(name).unwrap().with_port(port).unwrap()
}

async fn http_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let request = format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(2), stream.read_to_string(&mut response))
        .await
        .expect("response within timeout")
        .unwrap();
    response
}

#[tokio::test]
async fn tool_serves_health_and_derived_capability_endpoint_over_http() {
    let port = 19100;
    let tool = Arc::new(BaseTool::new("calculator", "adds numbers", config("calculator", port), Collaborators::default(), None));
    tool.register_capability("add", "adds two numbers", "", None);

    let framework = Framework::new(tool, Options::new()).unwrap();
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move { framework.run(run_cancel).await });

    // Give the listener a moment to bind before the first request.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let health = http_get(port, "/health").await;
    assert!(health.contains("200 OK"), "unexpected health response: {health}");
    assert!(health.contains("\"status\":\"healthy\""));

    let capabilities = http_get(port, "/api/capabilities").await;
    assert!(capabilities.contains("200 OK"));
    assert!(capabilities.contains("\"name\":\"add\""));
    assert!(capabilities.contains("\"endpoint\":\"/api/capabilities/add\""));

    let introspect = http_get(port, "/api/capabilities/add").await;
    assert!(introspect.contains("200 OK"));
    assert!(introspect.contains("\"capability\":\"add\""));

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn agent_discovers_a_tool_registered_against_the_shared_backend() {
    let registry = Arc::new(InMemoryRegistry::new());

    let tool_registry: Arc<dyn Registry> = registry.clone();
    let tool = Arc::new(BaseTool::new(
        "calculator",
        "",
        config("calculator", 19101),
        Collaborators::default(),
        Some(tool_registry),
    ));
    tool.initialize(CancellationToken::new()).await.unwrap();

    let discovery: Arc<dyn Discovery> = registry;
    let agent = BaseAgent::new("router", "", config("router", 19102), Collaborators::default(), Some(discovery));

    let found = agent.discover(ServiceFilter::new().with_name("calculator")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "calculator");

    tool.shutdown().await.unwrap();
}

#[tokio::test]
async fn framework_wires_in_memory_discovery_when_component_carries_none() {
    let config = config("router", 19103).with_discovery(true, "mock").unwrap();
    let agent = Arc::new(BaseAgent::new("router", "", config, Collaborators::default(), None));

    let framework = Framework::new(agent.clone(), Options::new()).unwrap();
    assert!(agent.core().registry().is_some());

    // The registry slot alone isn't proof the agent can discover — assert
    // the Discovery reference itself was wired by calling through it.
    let found = agent.discover(ServiceFilter::new()).await.unwrap();
    assert!(found.is_empty());

    drop(framework);
}
