use super::types::{
    Conjunction, FilterGroup, FilterLeaf, FilterNode, Operator, MAX_GROUP_DEPTH, ROOT_GROUP,
};
use crate::config::GrammarOptions;
use crate::errors::QueryError;
use crate::grammar::{group_by, names, GrammarMatch, PatternProvider};
use indexmap::{IndexMap, IndexSet};

/// A group declaration: `filter[group][$or][parent][0]=name`
#[derive(Debug, Clone, PartialEq)]
struct GroupCapture {
    name: String,
    parent: Option<String>,
    conjunction: Option<Conjunction>,
}

/// A condition: `filter[parent][0][path][$op]=values`
#[derive(Debug, Clone, PartialEq)]
struct LeafCapture {
    parent: Option<String>,
    conjunction: Option<Conjunction>,
    path: String,
    operator: Operator,
    values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Capture {
    Group(GroupCapture),
    Leaf(LeafCapture),
}

impl Capture {
    /// The group whose conjunction an explicit `[$and]`/`[$or]` in this capture sets
    fn conjunction_target(&self) -> Option<(&str, Conjunction)> {
        match self {
            Capture::Group(g) => g.conjunction.map(|c| (g.name.as_str(), c)),
            Capture::Leaf(l) => l
                .conjunction
                .map(|c| (l.parent.as_deref().unwrap_or(ROOT_GROUP), c)),
        }
    }
}

/// Parses the bracketed filter grammar into a [`FilterGroup`] tree rooted at `root`.
#[derive(Debug, Clone)]
pub struct FilterParser {
    provider: PatternProvider,
    value_delimiter: char,
}

impl FilterParser {
    pub fn new(options: &GrammarOptions) -> Result<Self, QueryError> {
        options.validate()?;
        Ok(Self {
            provider: PatternProvider::filter(options)?,
            value_delimiter: options.value_delimiter,
        })
    }

    pub fn provider(&self) -> &PatternProvider {
        &self.provider
    }

    /// Returns `Ok(None)` when the input holds no usable filter.
    ///
    /// Malformed or unreferenced captures are dropped. Errors are limited to node
    /// construction failures and groups declared with two different conjunctions.
    pub fn parse(&self, raw: &str) -> Result<Option<FilterGroup>, QueryError> {
        let matches = self.provider.matches(raw);
        if matches.is_empty() {
            return Ok(None);
        }
        let captures: Vec<Capture> = matches.iter().filter_map(|m| self.classify(m)).collect();
        assemble(captures)
    }

    fn classify(&self, m: &GrammarMatch) -> Option<Capture> {
        let conjunction = m
            .get_non_empty(names::CONJUNCTION)
            .and_then(Conjunction::from_token);
        let member_of = m
            .get(names::MEMBER_OF)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let value = m.get(names::VALUE).unwrap_or_default();

        if m.get_non_empty(names::KIND).is_some() {
            let name = value.trim();
            if name.is_empty() {
                tracing::debug!("Dropping group declaration without a name");
                return None;
            }
            return Some(Capture::Group(GroupCapture {
                name: name.to_string(),
                parent: member_of,
                conjunction,
            }));
        }

        let index = m.get_non_empty(names::GROUP_INDEX);
        let mut segments: Vec<String> = Vec::new();
        // `[name]` only names a parent group when an `[index]` follows it,
        // otherwise it is the first path segment
        let parent = match (member_of, index) {
            (Some(group), Some(_)) if m.get_non_empty(names::PATH).is_some() => Some(group),
            (Some(first), Some(index)) => {
                segments.push(first);
                segments.push(index.to_string());
                None
            }
            (Some(first), None) => {
                segments.push(first);
                None
            }
            (None, _) => None,
        };
        segments.extend(
            m.get(names::PATH)
                .unwrap_or_default()
                .split(['[', ']'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        let path = segments.join(".");
        if path.split('.').all(|s| s.trim().is_empty()) {
            tracing::debug!("Dropping filter condition with an empty path");
            return None;
        }

        let operator = m
            .get_non_empty(names::OPERATOR)
            .and_then(Operator::from_token)
            .unwrap_or_default();
        let values = if operator == Operator::Regex {
            vec![value.to_string()]
        } else {
            value
                .split(self.value_delimiter)
                .map(str::to_string)
                .collect()
        };

        Some(Capture::Leaf(LeafCapture {
            parent,
            conjunction,
            path,
            operator,
            values,
        }))
    }
}

type LeafKey = (String, String, Operator);

/// Folds captures into the tree. Pure: the same captures always give an equal tree.
fn assemble(captures: Vec<Capture>) -> Result<Option<FilterGroup>, QueryError> {
    let conjunctions = captures.iter().filter_map(Capture::conjunction_target).try_fold(
        IndexMap::new(),
        |mut declared: IndexMap<String, Conjunction>, (group, requested)| {
            match declared.get(group) {
                Some(existing) if *existing != requested => {
                    return Err(QueryError::ConjunctionConflict {
                        group: group.to_string(),
                        existing: *existing,
                        requested,
                    })
                }
                Some(_) => {}
                None => {
                    declared.insert(group.to_string(), requested);
                }
            }
            Ok(declared)
        },
    )?;

    let (groups, leaves): (Vec<Capture>, Vec<Capture>) = captures
        .into_iter()
        .partition(|c| matches!(c, Capture::Group(_)));

    let parents = groups.into_iter().fold(
        IndexMap::new(),
        |mut parents: IndexMap<String, String>, capture| {
            let Capture::Group(group) = capture else {
                return parents;
            };
            if group.name == ROOT_GROUP {
                if let Some(parent) = group.parent {
                    tracing::debug!("Ignoring parent '{}' declared for the root group", parent);
                }
                return parents;
            }
            let parent = group.parent.unwrap_or_else(|| ROOT_GROUP.to_string());
            if group.name == parent {
                tracing::debug!("Ignoring group '{}' declared as its own member", group.name);
            } else if let Some(existing) = parents.get(&group.name) {
                if *existing != parent {
                    tracing::debug!(
                        "Group '{}' already belongs to '{}', ignoring parent '{}'",
                        group.name,
                        existing,
                        parent
                    );
                }
            } else {
                parents.insert(group.name, parent);
            }
            parents
        },
    );

    let leaves: IndexMap<LeafKey, IndexSet<String>> = group_by(
        leaves.into_iter().filter_map(|c| match c {
            Capture::Leaf(leaf) => Some(leaf),
            Capture::Group(_) => None,
        }),
        |leaf| {
            Some((
                leaf.parent.clone().unwrap_or_else(|| ROOT_GROUP.to_string()),
                leaf.path.clone(),
                leaf.operator,
            ))
        },
    )
    .into_iter()
    .map(|(key, captures)| {
        let values: IndexSet<String> = captures.into_iter().flat_map(|c| c.values).collect();
        (key, values)
    })
    .collect();

    for (parent, path, _) in leaves.keys() {
        if parent != ROOT_GROUP && !parents.contains_key(parent) {
            tracing::debug!(
                "Dropping condition on '{}': group '{}' is never declared",
                path,
                parent
            );
        }
    }

    let mut leaves_by_group: IndexMap<&str, Vec<(&LeafKey, &IndexSet<String>)>> =
        IndexMap::new();
    for (key, values) in &leaves {
        leaves_by_group
            .entry(key.0.as_str())
            .or_default()
            .push((key, values));
    }
    let mut groups_by_parent: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for (child, parent) in &parents {
        groups_by_parent
            .entry(parent.as_str())
            .or_default()
            .push(child.as_str());
    }

    let tree = TreeBuilder {
        conjunctions: &conjunctions,
        leaves: &leaves_by_group,
        groups: &groups_by_parent,
    };
    let mut ancestors = Vec::new();
    tree.build(ROOT_GROUP, None, &mut ancestors)
}

/// Children indexed by the name of the group that owns them
struct TreeBuilder<'a> {
    conjunctions: &'a IndexMap<String, Conjunction>,
    leaves: &'a IndexMap<&'a str, Vec<(&'a LeafKey, &'a IndexSet<String>)>>,
    groups: &'a IndexMap<&'a str, Vec<&'a str>>,
}

impl TreeBuilder<'_> {
    /// Builds `name` and everything declared under it. Groups without any
    /// conditions below them are pruned, as are groups nested deeper than
    /// [`MAX_GROUP_DEPTH`].
    fn build(
        &self,
        name: &str,
        parent: Option<&str>,
        ancestors: &mut Vec<String>,
    ) -> Result<Option<FilterGroup>, QueryError> {
        ancestors.push(name.to_string());

        let mut children: Vec<FilterNode> = Vec::new();
        for (key, values) in self.leaves.get(name).into_iter().flatten() {
            let (_, path, operator) = key;
            let leaf = FilterLeaf::new(path, Some(name), path, *operator, values.iter().cloned())?;
            children.push(leaf.into());
        }
        for child in self.groups.get(name).into_iter().flatten() {
            if ancestors.iter().any(|ancestor| ancestor == child) {
                tracing::debug!("Ignoring cyclic reference to group '{}'", child);
                continue;
            }
            if ancestors.len() > MAX_GROUP_DEPTH {
                tracing::debug!(
                    "Dropping group '{}': nested deeper than {} levels",
                    child,
                    MAX_GROUP_DEPTH
                );
                continue;
            }
            if let Some(group) = self.build(child, Some(name), ancestors)? {
                children.push(group.into());
            }
        }

        ancestors.pop();
        if children.is_empty() {
            return Ok(None);
        }
        let conjunction = self.conjunctions.get(name).copied().unwrap_or_default();
        FilterGroup::new(name, parent, conjunction, children).map(Some)
    }
}
