//! Serve-mode regression tests.
//!
//! Drives the full router the daemon serves: discovery, object CRUD,
//! selectors, and the lifecycle side effects visible through the API.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use kubesim_api::{ApiState, build_router};
use kubesim_core::{KubesimConfig, ResourceSchema};
use kubesim_lifecycle::Engine;
use kubesim_state::ResourceStore;

fn test_router_with(store: ResourceStore) -> Router {
    let mut config = KubesimConfig::default();
    config.cluster.nodes = vec!["node-1".into(), "node-2".into()];
    config.cluster.seed = Some(42);
    let mut engine = Engine::new(store, ResourceSchema::default(), config.cluster.seed);
    engine
        .bootstrap(&config.cluster.namespaces, &config.cluster.nodes)
        .unwrap();
    build_router(ApiState::new(engine, &config))
}

fn test_router() -> Router {
    test_router_with(ResourceStore::open_in_memory().unwrap())
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri, None).await
}

fn items(list: &Value) -> Vec<&str> {
    list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["metadata"]["name"].as_str().unwrap())
        .collect()
}

fn pod(name: &str, tier: &str) -> Value {
    json!({
        "metadata": {"name": name, "labels": {"tier": tier}},
        "spec": {"containers": [{"name": "main", "image": "nginx", "ports": [{"containerPort": 80}]}]}
    })
}

fn controller(name: &str, replicas: u64) -> Value {
    json!({
        "metadata": {"name": name},
        "spec": {
            "replicas": replicas,
            "selector": {"app": name},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "main", "image": "nginx"}]}
            }
        }
    })
}

#[tokio::test]
async fn serve_version_and_openapi() {
    let router = test_router();
    let (status, body) = get(&router, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gitVersion"], "v1.10.4");
    assert_eq!(body["platform"], "linux/amd64");

    let (status, body) = get(&router, "/openapi/v2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].is_object());
}

#[tokio::test]
async fn serve_discovery() {
    let router = test_router();
    let (_, body) = get(&router, "/api").await;
    assert_eq!(body["versions"], json!(["v1"]));
    assert_eq!(
        body["serverAddressByClientCIDRs"][0]["serverAddress"],
        "127.0.0.1:6443"
    );

    let (_, body) = get(&router, "/apis/apps/v1").await;
    let names: Vec<&str> = body["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"deployments"));
    assert!(names.contains(&"replicasets"));

    let (status, _) = get(&router, "/healthz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serve_bootstrapped_cluster() {
    let router = test_router();
    let (_, body) = get(&router, "/api/v1/namespaces").await;
    assert_eq!(items(&body), vec!["default", "kube-system", "kube-public"]);
    assert_eq!(body["kind"], "NamespaceList");

    let (_, body) = get(&router, "/api/v1/nodes").await;
    assert_eq!(items(&body), vec!["node-1", "node-2"]);
}

#[tokio::test]
async fn serve_pod_create_conflict_and_placement() {
    let router = test_router();
    let uri = "/api/v1/namespaces/default/pods";
    let (status, created) = send(&router, "POST", uri, Some(pod("a", "frontend"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"]["phase"], "Running");
    let node = created["spec"]["nodeName"].as_str().unwrap();
    assert!(node == "node-1" || node == "node-2");
    assert_eq!(created["spec"]["containers"][0]["ports"][0]["protocol"], "TCP");

    let (status, body) = send(&router, "POST", uri, Some(pod("a", "frontend"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Status");
    assert_eq!(body["reason"], "AlreadyExists");
    assert_eq!(body["message"], "pods \"a\" already exists");
}

#[tokio::test]
async fn serve_label_selectors() {
    let router = test_router();
    let uri = "/api/v1/namespaces/default/pods";
    send(&router, "POST", uri, Some(pod("web", "frontend"))).await;
    send(&router, "POST", uri, Some(pod("db", "backend"))).await;

    let (_, body) = get(&router, &format!("{uri}?labelSelector=tier%3Dfrontend")).await;
    assert_eq!(items(&body), vec!["web"]);
    let (_, body) = get(&router, &format!("{uri}?labelSelector=tier!%3Dfrontend")).await;
    assert_eq!(items(&body), vec!["db"]);
    let (_, body) = get(&router, &format!("{uri}?labelSelector=!tier")).await;
    assert!(items(&body).is_empty());

    // Repeated reads are stable.
    let (_, first) = get(&router, "/api/v1/pods").await;
    let (_, second) = get(&router, "/api/v1/pods").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn serve_field_selector() {
    let router = test_router();
    let uri = "/api/v1/namespaces/default/pods";
    send(&router, "POST", uri, Some(pod("web", "frontend"))).await;
    send(&router, "POST", uri, Some(pod("db", "backend"))).await;

    let (_, body) = get(&router, &format!("{uri}?fieldSelector=metadata.name%3Ddb")).await;
    assert_eq!(items(&body), vec!["db"]);
}

#[tokio::test]
async fn serve_replication_controller_scaling() {
    let router = test_router();
    let rcs = "/api/v1/namespaces/default/replicationcontrollers";
    let pods = "/api/v1/namespaces/default/pods?labelSelector=app%3Dweb";

    let (status, _) = send(&router, "POST", rcs, Some(controller("web", 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = get(&router, pods).await;
    let before = items(&body).into_iter().map(str::to_string).collect::<Vec<_>>();
    assert_eq!(before.len(), 3);
    assert!(before.iter().all(|name| name.starts_with("web-")));

    let patch = json!({"spec": {"replicas": 1}});
    let (status, _) = send(&router, "PATCH", &format!("{rcs}/web"), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&router, pods).await;
    // Newest pods go first; the oldest survives.
    assert_eq!(items(&body), vec![before[0].as_str()]);
}

#[tokio::test]
async fn serve_volume_claim_binding() {
    let router = test_router();
    let volume = json!({
        "metadata": {"name": "pv1"},
        "spec": {"capacity": {"storage": "10Gi"}, "accessModes": ["ReadWriteOnce"]}
    });
    let (status, body) = send(&router, "POST", "/api/v1/persistentvolumes", Some(volume)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"]["phase"], "Available");

    let claim = json!({
        "metadata": {"name": "data"},
        "spec": {"volumeName": "pv1", "resources": {"requests": {"storage": "1Gi"}}}
    });
    let claims = "/api/v1/namespaces/default/persistentvolumeclaims";
    let (status, body) = send(&router, "POST", claims, Some(claim)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"]["phase"], "Bound");

    let (_, body) = get(&router, "/api/v1/persistentvolumes/pv1").await;
    assert_eq!(body["status"]["phase"], "Bound");
    assert_eq!(body["spec"]["claimRef"]["name"], "data");

    let (status, _) = send(&router, "DELETE", &format!("{claims}/data"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&router, "/api/v1/persistentvolumes/pv1").await;
    assert_eq!(body["status"]["phase"], "Released");
}

#[tokio::test]
async fn serve_deployment_rollout() {
    let router = test_router();
    let deployments = "/apis/apps/v1/namespaces/default/deployments";
    let sets = "/apis/apps/v1/namespaces/default/replicasets?labelSelector=app%3Dweb";

    let (status, _) = send(&router, "POST", deployments, Some(controller("web", 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = get(&router, sets).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["items"][0]["metadata"]["annotations"]["deployment.kubernetes.io/revision"],
        "1"
    );

    let patch = json!({"spec": {"template": {"spec": {"containers": [{"name": "main", "image": "nginx:2"}]}}}});
    send(&router, "PATCH", &format!("{deployments}/web"), Some(patch)).await;
    let (_, body) = get(&router, sets).await;
    let sets_now = body["items"].as_array().unwrap();
    assert_eq!(sets_now.len(), 2);
    let revision = |set: &Value| {
        set["metadata"]["annotations"]["deployment.kubernetes.io/revision"]
            .as_str()
            .unwrap()
            .to_string()
    };
    let old = sets_now.iter().find(|s| revision(s) == "1").unwrap();
    let new = sets_now.iter().find(|s| revision(s) == "2").unwrap();
    assert_eq!(old["spec"]["replicas"], 0);
    assert_eq!(new["spec"]["replicas"], 2);

    let (status, _) = send(&router, "DELETE", &format!("{deployments}/web"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&router, sets).await;
    assert!(items(&body).is_empty());
}

#[tokio::test]
async fn serve_service_defaults() {
    let router = test_router();
    let service = json!({
        "metadata": {"name": "web"},
        "spec": {"type": "NodePort", "selector": {"app": "web"}, "ports": [{"port": 80}]}
    });
    let (status, body) = send(&router, "POST", "/api/v1/namespaces/default/services", Some(service)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["spec"]["ports"][0]["targetPort"], 80);
    let node_port = body["spec"]["ports"][0]["nodePort"].as_u64().unwrap();
    assert!((30000..=32767).contains(&node_port));
}

#[tokio::test]
async fn serve_error_envelopes() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/namespaces/ghost/pods",
        Some(pod("a", "frontend")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "namespaces \"ghost\" not found");

    let (status, body) = get(&router, "/api/v1/namespaces/default/pods/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "NotFound");

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/namespaces/default/pods")
        .body(Body::from("{broken"))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = get(&router, "/api/v1/pods?labelSelector=tier%20gt%201").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "Failure");
}

#[tokio::test]
async fn serve_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kubesim.redb");
    {
        let router = test_router_with(ResourceStore::open(&path).unwrap());
        send(&router, "POST", "/api/v1/namespaces/default/pods", Some(pod("a", "frontend"))).await;
    }
    let router = test_router_with(ResourceStore::open(&path).unwrap());
    let (status, body) = get(&router, "/api/v1/namespaces/default/pods/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["labels"]["tier"], "frontend");

    let (_, body) = get(&router, "/api/v1/namespaces").await;
    assert_eq!(items(&body).len(), 3);
}
