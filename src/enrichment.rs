//! Geo enrichment of discovered nodes

use futures::future::join_all;
use std::sync::Arc;

use crate::geo::GeoResolver;
use crate::models::Node;

/// Batch size when the caller does not pick one
pub const DEFAULT_CONCURRENCY: usize = 10;

pub struct Enricher {
    resolver: Arc<GeoResolver>,
}

impl Enricher {
    pub fn new(resolver: Arc<GeoResolver>) -> Self {
        Self { resolver }
    }

    /// Fill in location fields for one node.
    ///
    /// Nodes that already carry region and country are returned as-is, as
    /// are nodes the resolver has no data for.
    pub async fn enrich_one(&self, node: Node) -> Node {
        if node.has_geo() {
            return node;
        }

        let target = if node.address.is_empty() {
            node.ip.as_str()
        } else {
            node.address.as_str()
        };

        match self.resolver.resolve_node(target).await {
            Some(geo) => node.with_geo(&geo),
            None => node,
        }
    }

    /// Enrich in sequential batches of `concurrency` (default
    /// [`DEFAULT_CONCURRENCY`]), preserving input order.
    ///
    /// At most `concurrency` geo lookups are in flight at any time.
    pub async fn enrich_many(&self, nodes: Vec<Node>, concurrency: Option<usize>) -> Vec<Node> {
        let batch_size = concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1);
        let mut enriched = Vec::with_capacity(nodes.len());

        let mut remaining = nodes.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<Node> = remaining.by_ref().take(batch_size).collect();
            let results = join_all(batch.into_iter().map(|node| self.enrich_one(node))).await;
            enriched.extend(results);
        }

        enriched
    }
}
