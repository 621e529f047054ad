// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an HTTP-level mock for the kube client and an in-memory
//! `ClusterApi` for exercising the sync engine.

use crate::error::{ClusterSecretError, Result as SyncResult};
use crate::kubernetes::ClusterApi;
use crate::types::{ClusterSecret, ClusterSecretStatus, SecretIdentity};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests (server-side apply, status patches)
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Add a response for DELETE requests matching the exact path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// A write the fake cluster received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Apply(String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    namespaces: BTreeSet<String>,
    secrets: BTreeMap<(String, String), Secret>,
    cluster_secrets: Vec<ClusterSecret>,
    statuses: HashMap<String, ClusterSecretStatus>,
    writes: Vec<Write>,
    unavailable: BTreeSet<String>,
}

/// In-memory cluster: namespaces, secrets and ClusterSecret statuses.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn with_namespaces(names: &[&str]) -> Self {
        let fake = Self::default();
        for name in names {
            fake.add_namespace(name);
        }
        fake
    }

    pub fn add_namespace(&self, name: &str) {
        self.state.lock().unwrap().namespaces.insert(name.to_string());
    }

    /// Delete a namespace and everything in it
    pub fn remove_namespace(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.remove(name);
        state.secrets.retain(|(ns, _), _| ns != name);
    }

    pub fn add_cluster_secret(&self, cs: ClusterSecret) {
        self.state.lock().unwrap().cluster_secrets.push(cs);
    }

    /// Put a secret in place without recording a write, as an external actor would
    pub fn put_secret(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.state.lock().unwrap().secrets.insert(key, secret);
    }

    /// Make every write into `namespace` fail with a server error
    pub fn fail_writes_in(&self, namespace: &str) {
        self.state.lock().unwrap().unavailable.insert(namespace.to_string());
    }

    pub fn heal(&self) {
        self.state.lock().unwrap().unavailable.clear();
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Namespaces holding a secret called `name`
    pub fn namespaces_with(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .keys()
            .filter(|(_, n)| n == name)
            .map(|(ns, _)| ns.clone())
            .collect()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    /// Last status written for the ClusterSecret called `name`
    pub fn status(&self, name: &str) -> Option<ClusterSecretStatus> {
        self.state.lock().unwrap().statuses.get(name).cloned()
    }
}

fn unavailable(namespace: &str) -> ClusterSecretError {
    ClusterSecretError::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("writes to {} are unavailable", namespace),
        reason: "ServiceUnavailable".to_string(),
        code: 503,
    }))
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_namespaces(&self) -> SyncResult<BTreeSet<String>> {
        Ok(self.state.lock().unwrap().namespaces.clone())
    }

    async fn list_cluster_secrets(&self) -> SyncResult<Vec<ClusterSecret>> {
        Ok(self.state.lock().unwrap().cluster_secrets.clone())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> SyncResult<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn apply_secret(&self, secret: &Secret) -> SyncResult<()> {
        let namespace = secret.namespace().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if state.unavailable.contains(&namespace) {
            return Err(unavailable(&namespace));
        }
        if !state.namespaces.contains(&namespace) {
            return Err(ClusterSecretError::NamespaceGone(namespace));
        }
        state.writes.push(Write::Apply(namespace.clone()));
        state
            .secrets
            .insert((namespace, secret.name_any()), secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable.contains(namespace) {
            return Err(unavailable(namespace));
        }
        state.writes.push(Write::Delete(namespace.to_string()));
        state
            .secrets
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn patch_status(
        &self,
        identity: &SecretIdentity,
        status: &ClusterSecretStatus,
    ) -> SyncResult<()> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(identity.name.clone(), status.clone());
        Ok(())
    }
}
