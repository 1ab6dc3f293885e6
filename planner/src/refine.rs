//! The refine-and-search algorithm: repeatedly expand the leftmost unrefined
//! todo item against the domain registry, backtracking over method choice
//! points by truncating the solution tree back to before the failed attempt.

use crate::tree::{NodeKind, SolutionTree};
use domain::{Blacklist, Domain, DurationSpec, Multigoal, RelationSpec, TodoItem, UnigoalSpec};
use state::{State, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use temporal::{add_duration, relation_to_constraints, Interval, Relation, TpId};

type TpPair = (TpId, TpId);
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct PlanOptions {
    /// Overrides `domain.verify_goals` when set; `None` defers to the
    /// domain's own flag.
    pub verify_goals: Option<bool>,
    /// Reserved for stochastic tie-breaking in method ordering; method lists
    /// are otherwise tried in registration order regardless of this value.
    pub seed: u64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions { verify_goals: None, seed: 0 }
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no applicable method or action sequence satisfies the given todos")]
    NoPlan,
    #[error("goal {predicate}.{subject} failed verification against the final state")]
    VerificationFailed { predicate: String, subject: String },
}

/// Per-attempt planning context: everything threaded through refinement that
/// isn't the state or the tree itself. Dropped at the end of one `plan` call,
/// matching the spec's requirement that concurrent attempts never share
/// mutable instances.
struct Ctx<'a> {
    domain: &'a Domain,
    clock: chrono::DateTime<chrono::Utc>,
    tp_registry: HashMap<String, TpPair>,
    goal_trail: Vec<UnigoalSpec>,
    /// Relations whose target action hadn't been scheduled yet when their
    /// owner was refined, keyed by nothing (a flat list is fine at the
    /// sizes a single plan attempt produces); resolved opportunistically
    /// every time a new action gets a timepoint pair, so a relation may
    /// name an action that is refined later in the todo sequence.
    pending_relations: Vec<(TpPair, RelationSpec)>,
}

type GoalAncestry = Vec<(String, String, u64)>;

pub fn plan(domain: &Domain, state: &State, todos: Vec<TodoItem>, options: &PlanOptions) -> Result<SolutionTree, PlanError> {
    plan_with_blacklist(domain, state, todos, options, Blacklist::new())
}

/// Same algorithm as [`plan`], but seeded with a blacklist carried in from
/// outside this attempt. The coordinator uses this to make a method or
/// command permanently unavailable across a replanning cycle (e.g. after a
/// temporal-validation failure or an execution-time command failure),
/// without reaching into `plan`'s otherwise attempt-local blacklist.
pub fn plan_with_blacklist(
    domain: &Domain,
    state: &State,
    todos: Vec<TodoItem>,
    options: &PlanOptions,
    mut blacklist: Blacklist,
) -> Result<SolutionTree, PlanError> {
    let mut tree = SolutionTree::new(state.clone());
    let root = tree.root();
    let mut ctx = Ctx {
        domain,
        clock: chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).expect("unix epoch is a valid instant"),
        tp_registry: HashMap::new(),
        goal_trail: Vec::new(),
        pending_relations: Vec::new(),
    };

    let todos = apply_multitodo_methods(domain, state, todos);
    let final_state = refine_sequence(&mut ctx, &mut tree, root, state.clone(), &todos, &mut blacklist, &Vec::new())
        .map_err(|_| PlanError::NoPlan)?;
    tree.node_mut(root).state_after = Some(final_state.clone());

    let verify = options.verify_goals.unwrap_or(domain.verify_goals);
    if verify {
        for goal in &ctx.goal_trail {
            let verify_node = tree.push_child(
                root,
                format!("verify:{}.{}", goal.predicate, goal.subject),
                NodeKind::Goal,
                final_state.clone(),
                blacklist.clone(),
            );
            if !final_state.matches(&goal.predicate, &goal.subject, &goal.value) {
                return Err(PlanError::VerificationFailed {
                    predicate: goal.predicate.clone(),
                    subject: goal.subject.clone(),
                });
            }
            tree.node_mut(verify_node).state_after = Some(final_state.clone());
        }
    }

    Ok(tree)
}

fn fingerprint_state(state: &State) -> u64 {
    let mut triples = state.to_triples();
    triples.sort_by(|a, b| (&a.predicate, &a.subject).cmp(&(&b.predicate, &b.subject)));
    let mut hasher = DefaultHasher::new();
    for triple in &triples {
        triple.predicate.hash(&mut hasher);
        triple.subject.hash(&mut hasher);
        hash_value(&triple.value, &mut hasher);
    }
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut impl Hasher) {
    match value {
        Value::Atom(s) => {
            0u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Num(n) => {
            1u8.hash(hasher);
            n.to_bits().hash(hasher);
        }
        Value::Str(s) => {
            2u8.hash(hasher);
            s.hash(hasher);
        }
        Value::List(items) => {
            3u8.hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Map(map) => {
            4u8.hash(hasher);
            for (k, v) in map {
                k.hash(hasher);
                hash_value(v, hasher);
            }
        }
    }
}

fn instance_label(name: &str, args: &[Value]) -> String {
    let mut hasher = DefaultHasher::new();
    for arg in args {
        hash_value(arg, &mut hasher);
    }
    format!("{name}#{:x}", hasher.finish())
}

fn resolve_duration(spec: &DurationSpec) -> Result<chrono::Duration, ()> {
    match spec {
        DurationSpec::Seconds(secs) => Ok(chrono::Duration::microseconds((secs * 1_000_000.0).round() as i64)),
        DurationSpec::Iso8601(text) => temporal::parse_iso8601_duration(text).map_err(|_| ()),
    }
}

fn relation_from_spec(spec: &RelationSpec) -> Option<Relation> {
    match spec.relation_tag.as_str() {
        "EQ" => Some(Relation::Eq),
        "PRECEDES" => Some(Relation::Precedes),
        "FOLLOWS" => Some(Relation::Follows),
        "ADJ_F" => Some(Relation::AdjF),
        "ADJ_B" => Some(Relation::AdjB),
        "WITHIN" => Some(Relation::Within),
        "CONTAINS" => Some(Relation::Contains),
        "START_ALIGN" => Some(Relation::StartAlign),
        "START_EXTEND" => Some(Relation::StartExtend),
        "END_ALIGN" => Some(Relation::EndAlign),
        "END_EXTEND" => Some(Relation::EndExtend),
        "OVERLAP_F" => Some(Relation::OverlapF),
        "OVERLAP_B" => Some(Relation::OverlapB),
        "MUTEX" => Some(Relation::Mutex),
        "FLEXIBLE" => spec.bounds.map(|(l, u)| Relation::Flexible(l, u)),
        "RESOURCE_BOUND" => spec.bounds.map(|(l, u)| Relation::ResourceBound(l, u)),
        "FUZZY" => spec.bounds.map(|(l, u)| Relation::Fuzzy(l, u)),
        "CONDITIONAL" => spec.bounds.map(|(l, u)| Relation::Conditional(l, u)),
        _ => None,
    }
}

fn apply_relation(tree: &mut SolutionTree, relation_spec: &RelationSpec, source_tps: TpPair, target_tps: TpPair) -> Result<(), ()> {
    let Some(relation) = relation_from_spec(relation_spec) else { return Ok(()) };
    for (i, j, lower, upper) in relation_to_constraints(relation, source_tps, target_tps) {
        tree.timeline_mut().stn_mut().add_constraint(i, j, lower, upper).map_err(|_| ())?;
    }
    Ok(())
}

fn refine_sequence(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    mut state: State,
    todos: &[TodoItem],
    blacklist: &mut Blacklist,
    goal_ancestry: &GoalAncestry,
) -> Result<State, ()> {
    for item in todos {
        state = refine_item(ctx, tree, parent, state, item, blacklist, goal_ancestry)?;
    }
    Ok(state)
}

fn refine_item(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    state: State,
    item: &TodoItem,
    blacklist: &mut Blacklist,
    goal_ancestry: &GoalAncestry,
) -> Result<State, ()> {
    match item {
        TodoItem::False => {
            tracing::debug!("false sentinel forced backtracking");
            Err(())
        }
        TodoItem::Action { name, args } => refine_action(ctx, tree, parent, state, name, args, false),
        TodoItem::DurativeAction { name, args } => refine_action(ctx, tree, parent, state, name, args, true),
        TodoItem::Task { name, args } => refine_task(ctx, tree, parent, state, name, args, blacklist, goal_ancestry),
        TodoItem::Goal(spec) => refine_goal(ctx, tree, parent, state, spec, blacklist, goal_ancestry),
        TodoItem::Multigoal(mg) => refine_multigoal(ctx, tree, parent, state, mg, blacklist, goal_ancestry),
    }
}

fn refine_action(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    state: State,
    name: &str,
    args: &[Value],
    durative: bool,
) -> Result<State, ()> {
    let action = ctx.domain.get_action(name).ok_or(())?.clone();
    let metadata = ctx.domain.get_action_metadata(name).cloned();
    let new_state = action(&state, args).map_err(|_| ())?;

    let label_prefix = if durative { "durative" } else { "action" };
    let node = tree.push_child(
        parent,
        format!("{label_prefix}:{name}"),
        NodeKind::Action,
        state.clone(),
        Blacklist::new(),
    );
    {
        let n = tree.node_mut(node);
        n.state_after = Some(new_state.clone());
        n.action_name = Some(name.to_string());
        n.action_args = args.to_vec();
        n.durative = durative;
    }

    if durative {
        let metadata = metadata.ok_or(())?;
        let duration = resolve_duration(&metadata.duration)?;
        let label = instance_label(name, args);
        let start = ctx.clock;
        let end = add_duration(start, duration);
        let interval = Interval::new(start, end).map_err(|_| ())?;
        tree.timeline_mut().add_interval(label.clone(), interval).map_err(|_| ())?;
        ctx.clock = end;

        let my_tps = tree.timeline().interval_timepoints(&label).expect("just inserted");
        ctx.tp_registry.insert(name.to_string(), my_tps);

        // resolve any relation that named this action as its target before
        // this action itself had been scheduled.
        let (resolved, still_pending): (Vec<_>, Vec<_>) =
            ctx.pending_relations.drain(..).partition(|(_, spec)| spec.target == name);
        ctx.pending_relations = still_pending;
        for (source_tps, relation_spec) in resolved {
            apply_relation(tree, &relation_spec, source_tps, my_tps)?;
        }

        for relation_spec in &metadata.temporal_relations {
            match ctx.tp_registry.get(&relation_spec.target).copied() {
                Some(target_tps) => apply_relation(tree, relation_spec, my_tps, target_tps)?,
                None => ctx.pending_relations.push((my_tps, relation_spec.clone())),
            }
        }

        if !tree.timeline().consistent() {
            return Err(());
        }
    }

    Ok(new_state)
}

fn refine_task(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    state: State,
    name: &str,
    args: &[Value],
    blacklist: &mut Blacklist,
    goal_ancestry: &GoalAncestry,
) -> Result<State, ()> {
    let candidates = ctx.domain.all_methods_for_task(name);
    for (method_id, body) in candidates {
        if blacklist.is_banned(method_id, args) {
            continue;
        }
        let mark = tree.mark();
        let method_node = tree.push_child(parent, format!("method:{method_id}"), NodeKind::Method, state.clone(), blacklist.clone());
        tree.node_mut(method_node).method_args = args.to_vec();
        let sub_todos = match body(&state, args) {
            Ok(todos) => todos,
            Err(_) => {
                tree.truncate_to(mark);
                blacklist.ban(method_id, args);
                continue;
            }
        };
        match refine_sequence(ctx, tree, method_node, state.clone(), &sub_todos, blacklist, goal_ancestry) {
            Ok(new_state) => {
                tree.node_mut(method_node).state_after = Some(new_state.clone());
                tree.node_mut(method_node).method_chosen = Some(method_id.to_string());
                return Ok(new_state);
            }
            Err(()) => {
                tree.truncate_to(mark);
                blacklist.ban(method_id, args);
            }
        }
    }
    Err(())
}

fn refine_goal(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    state: State,
    spec: &UnigoalSpec,
    blacklist: &mut Blacklist,
    goal_ancestry: &GoalAncestry,
) -> Result<State, ()> {
    if state.matches(&spec.predicate, &spec.subject, &spec.value) {
        let node = tree.push_child(
            parent,
            format!("goal:{}.{}", spec.predicate, spec.subject),
            NodeKind::Goal,
            state.clone(),
            blacklist.clone(),
        );
        tree.node_mut(node).state_after = Some(state.clone());
        ctx.goal_trail.push(spec.clone());
        return Ok(state);
    }

    let fp = fingerprint_state(&state);
    let key = (spec.predicate.clone(), spec.subject.clone(), fp);
    if goal_ancestry.contains(&key) {
        tracing::debug!(predicate = %spec.predicate, subject = %spec.subject, "goal cycle detected, forcing backtrack");
        return Err(());
    }
    let mut nested_ancestry = goal_ancestry.clone();
    nested_ancestry.push(key);

    let mark = tree.mark();
    let goal_node = tree.push_child(
        parent,
        format!("goal:{}.{}", spec.predicate, spec.subject),
        NodeKind::Goal,
        state.clone(),
        blacklist.clone(),
    );

    let candidates = ctx.domain.get_methods_for(&spec.predicate);
    for (method_id, body) in candidates {
        let fingerprint_args = [spec.value.clone()];
        if blacklist.is_banned(method_id, &fingerprint_args) {
            continue;
        }
        let inner_mark = tree.mark();
        let method_node = tree.push_child(goal_node, format!("method:{method_id}"), NodeKind::Method, state.clone(), blacklist.clone());
        tree.node_mut(method_node).method_args = fingerprint_args.to_vec();
        let sub_todos = match body(&state, &spec.subject, &spec.value) {
            Ok(todos) => todos,
            Err(_) => {
                tree.truncate_to(inner_mark);
                blacklist.ban(method_id, &fingerprint_args);
                continue;
            }
        };
        match refine_sequence(ctx, tree, method_node, state.clone(), &sub_todos, blacklist, &nested_ancestry) {
            Ok(new_state) => {
                tree.node_mut(method_node).state_after = Some(new_state.clone());
                tree.node_mut(method_node).method_chosen = Some(method_id.to_string());
                tree.node_mut(goal_node).state_after = Some(new_state.clone());
                ctx.goal_trail.push(spec.clone());
                return Ok(new_state);
            }
            Err(()) => {
                tree.truncate_to(inner_mark);
                blacklist.ban(method_id, &fingerprint_args);
            }
        }
    }

    tree.truncate_to(mark);
    Err(())
}

/// Custom multigoal methods are tried first, in registration order; if none
/// apply, the default policy splits the multigoal into its constituent unigoal
/// todos and refines them left to right.
fn refine_multigoal(
    ctx: &mut Ctx<'_>,
    tree: &mut SolutionTree,
    parent: crate::tree::NodeId,
    state: State,
    mg: &Multigoal,
    blacklist: &mut Blacklist,
    goal_ancestry: &GoalAncestry,
) -> Result<State, ()> {
    let fingerprint_args = [multigoal_fingerprint_value(mg)];
    let mark = tree.mark();
    let multigoal_node = tree.push_child(parent, format!("multigoal:{}", mg.name), NodeKind::Multigoal, state.clone(), blacklist.clone());
    tree.node_mut(multigoal_node).method_args = fingerprint_args.to_vec();

    for (method_id, body) in ctx.domain.multigoal_methods() {
        if blacklist.is_banned(method_id, &fingerprint_args) {
            continue;
        }
        let inner_mark = tree.mark();
        let sub_todos = match body(&state, mg) {
            Ok(todos) => todos,
            Err(_) => {
                tree.truncate_to(inner_mark);
                blacklist.ban(method_id, &fingerprint_args);
                continue;
            }
        };
        match refine_sequence(ctx, tree, multigoal_node, state.clone(), &sub_todos, blacklist, goal_ancestry) {
            Ok(new_state) => {
                tree.node_mut(multigoal_node).state_after = Some(new_state.clone());
                tree.node_mut(multigoal_node).method_chosen = Some(method_id.to_string());
                return Ok(new_state);
            }
            Err(()) => {
                tree.truncate_to(inner_mark);
                blacklist.ban(method_id, &fingerprint_args);
            }
        }
    }

    // default policy: split into one Goal todo per element, left to right.
    let split: Vec<TodoItem> = mg.goals.iter().cloned().map(TodoItem::Goal).collect();
    match refine_sequence(ctx, tree, multigoal_node, state.clone(), &split, blacklist, goal_ancestry) {
        Ok(new_state) => {
            tree.node_mut(multigoal_node).state_after = Some(new_state.clone());
            tree.node_mut(multigoal_node).method_chosen = Some("split_multigoal".to_string());
            Ok(new_state)
        }
        Err(()) => {
            tree.truncate_to(mark);
            Err(())
        }
    }
}

fn multigoal_fingerprint_value(mg: &Multigoal) -> Value {
    Value::List(
        mg.goals
            .iter()
            .map(|g| {
                let mut map = std::collections::BTreeMap::new();
                map.insert("predicate".to_string(), Value::Str(g.predicate.clone()));
                map.insert("subject".to_string(), Value::Str(g.subject.clone()));
                map.insert("value".to_string(), g.value.clone());
                Value::Map(map)
            })
            .collect(),
    )
}

/// Runs a registered multitodo method (if any) over the remaining flat todo
/// list before ordinary left-to-right refinement, letting a domain reorder or
/// merge todos for efficiency. Advisory only: if no multitodo method applies,
/// or all of them fail, the caller proceeds with the original order — a
/// multitodo method can never be the sole way to find a plan.
pub fn apply_multitodo_methods(domain: &Domain, state: &State, todos: Vec<TodoItem>) -> Vec<TodoItem> {
    for (_, body) in domain.multitodo_methods() {
        if let Ok(reordered) = body(state, &todos) {
            return reordered;
        }
    }
    todos
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ActionMetadata, DurationSpec as DS};
    use std::sync::Arc;

    fn make_state() -> State {
        State::new().set_fact("at", "r1", Value::Str("dock".into()))
    }

    #[test]
    fn single_action_plan_advances_state() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                Arc::new(|s: &State, args: &[Value]| {
                    let dest = args[0].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("at", "r1", Value::Str(dest)))
                }),
                ActionMetadata::new(DS::Seconds(1.0)),
            )
            .unwrap();
        let todos = vec![TodoItem::Action { name: "move".into(), args: vec![Value::Str("shop".into())] }];
        let tree = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap();
        let leaves = tree.flatten_actions();
        assert_eq!(leaves.len(), 1);
        assert_eq!(
            tree.node(leaves[0]).state_after.as_ref().unwrap().get_fact("at", "r1"),
            Some(&Value::Str("shop".into()))
        );
    }

    #[test]
    fn failing_method_is_blacklisted_and_next_alternative_is_tried() {
        let mut domain = Domain::new();
        domain.add_task_method("commute", "bad", Arc::new(|_: &State, _: &[Value]| Ok(vec![TodoItem::False])));
        domain.add_task_method(
            "commute",
            "good",
            Arc::new(|_: &State, _: &[Value]| Ok(vec![TodoItem::Action { name: "noop".into(), args: vec![] }])),
        );
        domain
            .add_action("noop", Arc::new(|s: &State, _: &[Value]| Ok(s.clone())), ActionMetadata::new(DS::Seconds(1.0)))
            .unwrap();

        let todos = vec![TodoItem::Task { name: "commute".into(), args: vec![] }];
        let tree = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap();
        let methods: Vec<&str> = tree.nodes().iter().filter_map(|n| n.method_chosen.as_deref()).collect();
        assert!(methods.contains(&"good"));
        assert!(!methods.contains(&"bad"));
    }

    #[test]
    fn unigoal_short_circuits_when_already_satisfied() {
        let domain = Domain::new();
        let state = make_state();
        let todos = vec![TodoItem::Goal(UnigoalSpec { predicate: "at".into(), subject: "r1".into(), value: Value::Str("dock".into()) })];
        let tree = plan(&domain, &state, todos, &PlanOptions::default()).unwrap();
        assert!(tree.flatten_actions().is_empty());
    }

    #[test]
    fn unreachable_task_fails_with_no_plan() {
        let domain = Domain::new();
        let todos = vec![TodoItem::Task { name: "nonexistent".into(), args: vec![] }];
        let err = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::NoPlan));
    }

    #[test]
    fn false_sentinel_forces_failure() {
        let domain = Domain::new();
        let todos = vec![TodoItem::False];
        let err = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::NoPlan));
    }

    #[test]
    fn multigoal_without_custom_method_falls_back_to_split() {
        let domain = Domain::new();
        let state = State::new()
            .set_fact("at", "r1", Value::Str("dock".into()))
            .set_fact("at", "r2", Value::Str("bay".into()));
        let mg = Multigoal::new(
            "parking",
            vec![
                UnigoalSpec { predicate: "at".into(), subject: "r1".into(), value: Value::Str("dock".into()) },
                UnigoalSpec { predicate: "at".into(), subject: "r2".into(), value: Value::Str("bay".into()) },
            ],
        );
        let tree = plan(&domain, &state, vec![TodoItem::Multigoal(mg)], &PlanOptions::default()).unwrap();
        let methods: Vec<&str> = tree.nodes().iter().filter_map(|n| n.method_chosen.as_deref()).collect();
        assert!(methods.contains(&"split_multigoal"));
    }

    #[test]
    fn durative_action_registers_an_interval_on_the_working_timeline() {
        let mut domain = Domain::new();
        domain
            .add_action(
                "move",
                Arc::new(|s: &State, args: &[Value]| {
                    let dest = args[0].as_str().unwrap_or_default().to_string();
                    Ok(s.clone().set_fact("at", "r1", Value::Str(dest)))
                }),
                ActionMetadata::new(DS::Iso8601("PT30M".into())),
            )
            .unwrap();
        let todos = vec![TodoItem::DurativeAction { name: "move".into(), args: vec![Value::Str("shop".into())] }];
        let tree = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap();
        assert_eq!(tree.timeline().interval_ids().count(), 1);
        assert!(tree.timeline().consistent());
    }

    #[test]
    fn precedes_relation_declared_on_the_earlier_action_constrains_the_later_one() {
        use domain::RelationSpec;

        let mut domain = Domain::new();
        let noop: domain::ActionFn = Arc::new(|s: &State, _: &[Value]| Ok(s.clone()));
        domain
            .add_action(
                "a",
                noop.clone(),
                ActionMetadata::new(DS::Seconds(3600.0)).with_temporal_relations(vec![RelationSpec {
                    relation_tag: "PRECEDES".into(),
                    target: "b".into(),
                    bounds: None,
                }]),
            )
            .unwrap();
        domain.add_action("b", noop, ActionMetadata::new(DS::Seconds(3600.0))).unwrap();

        let todos = vec![
            TodoItem::DurativeAction { name: "a".into(), args: vec![] },
            TodoItem::DurativeAction { name: "b".into(), args: vec![] },
        ];
        let tree = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap();
        assert!(tree.timeline().consistent());

        let a_tps = tree.timeline().interval_timepoints(&instance_label("a", &[])).unwrap();
        let b_tps = tree.timeline().interval_timepoints(&instance_label("b", &[])).unwrap();
        let bound = tree.timeline().stn().bound_between(a_tps.1, b_tps.0).expect("relation should have been applied");
        assert_eq!(bound.1, -1, "a must end strictly before b starts");
    }

    #[test]
    fn verify_goals_catches_a_method_that_lies_about_its_effects() {
        let mut domain = Domain::new();
        domain.verify_goals = true;
        domain.add_unigoal_method(
            "at",
            "teleport_but_dont",
            Arc::new(|_: &State, _: &str, _: &Value| Ok(vec![])),
        );
        let todos = vec![TodoItem::Goal(UnigoalSpec { predicate: "at".into(), subject: "r1".into(), value: Value::Str("shop".into()) })];
        let err = plan(&domain, &make_state(), todos, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::VerificationFailed { .. }));
    }
}
