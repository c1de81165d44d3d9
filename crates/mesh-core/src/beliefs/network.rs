//! Belief Network
//!
//! Per-agent store of beliefs plus the dependency graph between them.
//!
//! Dependency edges point from a dependent belief to its prerequisite. An
//! update to a prerequisite cascades breadth-first through every belief that
//! transitively depends on it. A visited set bounds the walk to one visit per
//! node even if the graph were ever to contain a cycle.

use mesh_events::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use super::belief::{validate_confidence, Belief};
use crate::error::BeliefError;
use crate::output::NetworkSnapshot;

/// How a dependent belief's new confidence is derived during propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStrategy {
    /// Copy the confidence of the prerequisite that just changed
    #[default]
    Copy,
    /// Mean of all prerequisites' confidences
    Mean,
    /// Confidence of the weakest prerequisite
    Min,
}

impl PropagationStrategy {
    /// Resolves a dependent's confidence.
    ///
    /// `source` is the confidence of the prerequisite that triggered this
    /// step; `prerequisites` holds every prerequisite's confidence as of
    /// this update (including `source`).
    pub fn resolve(&self, source: f64, prerequisites: &[f64]) -> f64 {
        if prerequisites.is_empty() {
            return source;
        }
        match self {
            PropagationStrategy::Copy => source,
            PropagationStrategy::Mean => {
                prerequisites.iter().sum::<f64>() / prerequisites.len() as f64
            }
            PropagationStrategy::Min => prerequisites.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Kind of change recorded in the update log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateKind {
    Add,
    Update,
    Remove,
}

/// Audit trail entry for one change to the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLogEntry {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub proposition: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Prerequisite whose change caused this update, for cascaded updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagated_from: Option<String>,
}

impl UpdateLogEntry {
    fn new(kind: UpdateKind, proposition: impl Into<String>) -> Self {
        Self {
            kind,
            proposition: proposition.into(),
            timestamp: now_millis(),
            confidence: None,
            previous_confidence: None,
            dependencies: Vec::new(),
            propagated_from: None,
        }
    }
}

/// Aggregate view of a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub belief_count: usize,
    /// Mean confidence across all beliefs (0.0 when empty)
    pub mean_confidence: f64,
}

/// One planned change in a propagation pass
struct PlannedUpdate {
    proposition: String,
    confidence: f64,
    propagated_from: Option<String>,
}

/// Beliefs owned by one agent, plus their dependency graph
#[derive(Debug, Clone, Default)]
pub struct BeliefNetwork {
    agent_id: String,
    beliefs: HashMap<String, Belief>,
    /// Propositions in insertion order, for deterministic listing
    order: Vec<String>,
    /// proposition -> propositions it depends on
    dependencies: HashMap<String, BTreeSet<String>>,
    /// proposition -> propositions depending on it, in insertion order
    dependents: HashMap<String, Vec<String>>,
    update_log: Vec<UpdateLogEntry>,
    strategy: PropagationStrategy,
}

impl BeliefNetwork {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self::with_strategy(agent_id, PropagationStrategy::default())
    }

    pub fn with_strategy(agent_id: impl Into<String>, strategy: PropagationStrategy) -> Self {
        Self {
            agent_id: agent_id.into(),
            strategy,
            ..Self::default()
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn strategy(&self) -> PropagationStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: PropagationStrategy) {
        self.strategy = strategy;
    }

    /// Adds a new belief depending on the given existing propositions.
    pub fn add_belief(
        &mut self,
        proposition: impl Into<String>,
        confidence: f64,
        justification: impl Into<String>,
        dependencies: &[&str],
    ) -> Result<&Belief, BeliefError> {
        let proposition = proposition.into();
        if self.beliefs.contains_key(&proposition) {
            return Err(BeliefError::Duplicate { proposition });
        }
        if let Some(missing) = dependencies.iter().find(|d| !self.beliefs.contains_key(**d)) {
            return Err(BeliefError::MissingDependency {
                proposition,
                missing: missing.to_string(),
            });
        }
        let belief = Belief::new(proposition.clone(), confidence, justification)?;

        let deps: BTreeSet<String> = dependencies.iter().map(|d| d.to_string()).collect();
        let mut entry = UpdateLogEntry::new(UpdateKind::Add, proposition.clone());
        entry.confidence = Some(belief.confidence());
        entry.dependencies = deps.iter().cloned().collect();
        self.update_log.push(entry);

        tracing::debug!(
            agent = %self.agent_id,
            proposition = %proposition,
            confidence = belief.confidence(),
            dependencies = deps.len(),
            "belief added"
        );

        for dep in &deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(proposition.clone());
        }
        if !deps.is_empty() {
            self.dependencies.insert(proposition.clone(), deps);
        }
        self.order.push(proposition.clone());
        Ok(&*self.beliefs.entry(proposition).or_insert(belief))
    }

    /// Updates a belief and cascades the change to every transitive dependent.
    ///
    /// Returns every changed belief in visit order, starting with the root.
    /// Nothing is written unless the whole cascade is valid.
    pub fn update_belief(
        &mut self,
        proposition: &str,
        confidence: f64,
        justification: impl Into<String>,
    ) -> Result<Vec<Belief>, BeliefError> {
        if !self.beliefs.contains_key(proposition) {
            return Err(BeliefError::NotFound {
                proposition: proposition.to_string(),
            });
        }
        let confidence = validate_confidence(confidence)?;

        let plan = self.plan_propagation(proposition, confidence);
        for step in &plan {
            validate_confidence(step.confidence)?;
        }

        let justification = justification.into();
        let mut changed = Vec::with_capacity(plan.len());
        for step in plan {
            let note = match &step.propagated_from {
                Some(source) => format!("Propagated from '{}'", source),
                None => justification.clone(),
            };
            let Some(belief) = self.beliefs.get_mut(&step.proposition) else {
                continue;
            };
            let previous = belief.confidence();
            belief.update(step.confidence, note)?;
            changed.push(belief.clone());

            if let Some(source) = &step.propagated_from {
                tracing::debug!(
                    agent = %self.agent_id,
                    proposition = %step.proposition,
                    from = %source,
                    confidence = step.confidence,
                    "belief propagated"
                );
            }

            let mut entry = UpdateLogEntry::new(UpdateKind::Update, step.proposition);
            entry.confidence = Some(step.confidence);
            entry.previous_confidence = Some(previous);
            entry.propagated_from = step.propagated_from;
            self.update_log.push(entry);
        }

        Ok(changed)
    }

    /// Breadth-first walk of the inverse dependency graph from `root`.
    fn plan_propagation(&self, root: &str, confidence: f64) -> Vec<PlannedUpdate> {
        let mut planned: HashMap<String, f64> = HashMap::new();
        planned.insert(root.to_string(), confidence);

        let mut plan = vec![PlannedUpdate {
            proposition: root.to_string(),
            confidence,
            propagated_from: None,
        }];
        let mut visited: HashSet<String> = HashSet::from([root.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([root.to_string()]);

        while let Some(current) = queue.pop_front() {
            let source = planned.get(&current).copied().unwrap_or(confidence);

            for dependent in self.dependent_propositions(&current) {
                if !visited.insert(dependent.to_string()) {
                    continue;
                }
                let prerequisites: Vec<f64> = self
                    .dependencies
                    .get(dependent)
                    .into_iter()
                    .flatten()
                    .filter_map(|p| {
                        planned
                            .get(p)
                            .copied()
                            .or_else(|| self.beliefs.get(p).map(Belief::confidence))
                    })
                    .collect();
                let resolved = self.strategy.resolve(source, &prerequisites);

                planned.insert(dependent.to_string(), resolved);
                plan.push(PlannedUpdate {
                    proposition: dependent.to_string(),
                    confidence: resolved,
                    propagated_from: Some(current.clone()),
                });
                queue.push_back(dependent.to_string());
            }
        }

        plan
    }

    /// Propositions that directly depend on `proposition`, in insertion order.
    fn dependent_propositions<'a>(&'a self, proposition: &str) -> impl Iterator<Item = &'a str> {
        self.dependents
            .get(proposition)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Beliefs that directly depend on `proposition`.
    pub fn get_dependents(&self, proposition: &str) -> Vec<&Belief> {
        self.dependent_propositions(proposition)
            .filter_map(|p| self.beliefs.get(p))
            .collect()
    }

    /// Beliefs that `proposition` directly depends on.
    pub fn get_dependencies(&self, proposition: &str) -> Vec<&Belief> {
        self.dependencies
            .get(proposition)
            .into_iter()
            .flatten()
            .filter_map(|p| self.beliefs.get(p))
            .collect()
    }

    /// Removes a belief and severs every edge touching it.
    ///
    /// Dependents stay in the network; they only lose the edge.
    pub fn remove_belief(&mut self, proposition: &str) -> bool {
        let Some(removed) = self.beliefs.remove(proposition) else {
            return false;
        };
        self.order.retain(|p| p != proposition);

        for dep in self.dependencies.remove(proposition).into_iter().flatten() {
            if let Some(dependents) = self.dependents.get_mut(&dep) {
                dependents.retain(|d| d != proposition);
            }
        }
        for dependent in self.dependents.remove(proposition).into_iter().flatten() {
            if let Some(deps) = self.dependencies.get_mut(&dependent) {
                deps.remove(proposition);
            }
        }
        self.dependencies.retain(|_, deps| !deps.is_empty());
        self.dependents.retain(|_, dependents| !dependents.is_empty());

        let mut entry = UpdateLogEntry::new(UpdateKind::Remove, proposition);
        entry.previous_confidence = Some(removed.confidence());
        self.update_log.push(entry);

        tracing::debug!(agent = %self.agent_id, proposition, "belief removed");
        true
    }

    pub fn get_belief(&self, proposition: &str) -> Option<&Belief> {
        self.beliefs.get(proposition)
    }

    pub fn contains(&self, proposition: &str) -> bool {
        self.beliefs.contains_key(proposition)
    }

    /// Iterates beliefs in insertion order.
    pub fn beliefs(&self) -> impl Iterator<Item = &Belief> {
        self.order.iter().filter_map(|p| self.beliefs.get(p))
    }

    /// All beliefs in insertion order.
    pub fn get_all_beliefs(&self) -> Vec<&Belief> {
        self.beliefs().collect()
    }

    /// Propositions in insertion order.
    pub fn propositions(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn update_log(&self) -> &[UpdateLogEntry] {
        &self.update_log
    }

    /// Dependency edges keyed by dependent proposition, sorted.
    pub fn dependency_map(&self) -> BTreeMap<String, Vec<String>> {
        self.dependencies
            .iter()
            .map(|(p, deps)| (p.clone(), deps.iter().cloned().collect()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }

    pub fn get_stats(&self) -> NetworkStats {
        let belief_count = self.beliefs.len();
        let mean_confidence = if belief_count == 0 {
            0.0
        } else {
            self.beliefs().map(Belief::confidence).sum::<f64>() / belief_count as f64
        };
        NetworkStats {
            belief_count,
            mean_confidence,
        }
    }

    /// Captures beliefs, dependencies and the update log.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            agent_id: self.agent_id.clone(),
            strategy: self.strategy,
            beliefs: self.beliefs().cloned().collect(),
            dependencies: self.dependency_map(),
            update_log: self.update_log.clone(),
        }
    }

    /// Rehydrates a network from a snapshot.
    ///
    /// Enforces what `add_belief` enforces: valid confidence, unique
    /// propositions, and every prerequisite listed before its dependent in
    /// `beliefs`, which also rules out cycles. History and the update log
    /// are taken as recorded.
    pub fn from_snapshot(snapshot: NetworkSnapshot) -> Result<Self, BeliefError> {
        let mut network = Self::with_strategy(snapshot.agent_id, snapshot.strategy);

        for belief in snapshot.beliefs {
            validate_confidence(belief.confidence())?;
            let proposition = belief.proposition().to_string();
            if network.beliefs.contains_key(&proposition) {
                return Err(BeliefError::Duplicate { proposition });
            }
            network.order.push(proposition.clone());
            network.beliefs.insert(proposition, belief);
        }

        let position: HashMap<&str, usize> = network
            .order
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), i))
            .collect();
        let mut dependencies: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (proposition, deps) in snapshot.dependencies {
            let Some(&at) = position.get(proposition.as_str()) else {
                return Err(BeliefError::NotFound { proposition });
            };
            // A prerequisite must have existed when its dependent was added.
            let misplaced = deps
                .iter()
                .find(|d| position.get(d.as_str()).map_or(true, |&i| i >= at));
            if let Some(missing) = misplaced {
                return Err(BeliefError::MissingDependency {
                    missing: missing.clone(),
                    proposition,
                });
            }
            if !deps.is_empty() {
                dependencies.insert(proposition, deps.into_iter().collect());
            }
        }

        for proposition in &network.order {
            for dep in dependencies.get(proposition).into_iter().flatten() {
                network
                    .dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(proposition.clone());
            }
        }
        network.dependencies = dependencies;
        network.update_log = snapshot.update_log;
        Ok(network)
    }
}
