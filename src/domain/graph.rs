//! Related-post graph: posts linked through shared projects and categories.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::posts::BlogPost;

pub const CATEGORY_COLORS: [&str; 12] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEEAD", "#D4A5A5", "#9B59B6", "#3498DB",
    "#E67E22", "#2ECC71", "#F1C40F", "#E74C3C",
];

const PROJECT_NODE_VAL: u32 = 3;
const POST_NODE_VAL: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Post,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Project,
    Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub val: u32,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Category colour; `None` lets the client pick a theme-neutral colour.
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub category: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub legend: Vec<LegendEntry>,
}

pub fn project_node_id(project: &str) -> String {
    format!("proj-{project}")
}

pub fn build_graph(posts: &[BlogPost]) -> PostGraph {
    if posts.is_empty() {
        return PostGraph::default();
    }

    let mut legend: Vec<LegendEntry> = Vec::new();
    let mut colors: HashMap<&str, &'static str> = HashMap::new();
    for category in posts.iter().filter_map(|post| post.category.as_deref()) {
        if !colors.contains_key(category) {
            let color = CATEGORY_COLORS[colors.len() % CATEGORY_COLORS.len()];
            colors.insert(category, color);
            legend.push(LegendEntry {
                category: category.to_string(),
                color: color.to_string(),
            });
        }
    }

    let mut nodes = Vec::new();
    let mut seen_projects: Vec<&str> = Vec::new();
    for project in posts.iter().filter_map(|post| post.project.as_deref()) {
        if !seen_projects.contains(&project) {
            seen_projects.push(project);
            nodes.push(GraphNode {
                id: project_node_id(project),
                name: project.to_string(),
                val: PROJECT_NODE_VAL,
                kind: NodeKind::Project,
                category: None,
                color: None,
            });
        }
    }

    let mut links = Vec::new();
    for post in posts {
        nodes.push(GraphNode {
            id: post.id.to_string(),
            name: post.title.clone(),
            val: POST_NODE_VAL,
            kind: NodeKind::Post,
            category: post.category.clone(),
            color: post
                .category
                .as_deref()
                .and_then(|category| colors.get(category))
                .map(|color| color.to_string()),
        });

        if let Some(project) = &post.project {
            links.push(GraphLink {
                source: project_node_id(project),
                target: post.id.to_string(),
                kind: LinkKind::Project,
            });
        }
    }

    for entry in &legend {
        let members: Vec<&BlogPost> = posts
            .iter()
            .filter(|post| post.category.as_deref() == Some(entry.category.as_str()))
            .collect();
        for pair in members.windows(2) {
            links.push(GraphLink {
                source: pair[0].id.to_string(),
                target: pair[1].id.to_string(),
                kind: LinkKind::Category,
            });
        }
    }

    PostGraph {
        nodes,
        links,
        legend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::NotionId;

    fn post(n: u32, category: Option<&str>, project: Option<&str>) -> BlogPost {
        BlogPost {
            id: NotionId::parse(&format!("{n:032x}")).expect("valid id"),
            title: format!("Post {n}"),
            description: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
            tags: Vec::new(),
            category: category.map(str::to_string),
            project: project.map(str::to_string),
        }
    }

    #[test]
    fn empty_posts_yield_empty_graph() {
        assert_eq!(build_graph(&[]), PostGraph::default());
    }

    #[test]
    fn projects_become_hub_nodes() {
        let posts = [
            post(1, None, Some("folio")),
            post(2, None, Some("folio")),
            post(3, None, None),
        ];
        let graph = build_graph(&posts);

        let projects: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Project)
            .collect();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "proj-folio");
        assert_eq!(projects[0].val, 3);
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.links.len(), 2);
        assert!(graph.links.iter().all(|l| l.source == "proj-folio"));
    }

    #[test]
    fn categories_chain_in_listing_order() {
        let posts = [
            post(1, Some("Rust"), None),
            post(2, Some("Design"), None),
            post(3, Some("Rust"), None),
            post(4, Some("Rust"), None),
        ];
        let graph = build_graph(&posts);

        let chain: Vec<_> = graph
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::Category)
            .map(|l| (l.source.clone(), l.target.clone()))
            .collect();
        assert_eq!(
            chain,
            vec![
                (posts[0].id.to_string(), posts[2].id.to_string()),
                (posts[2].id.to_string(), posts[3].id.to_string()),
            ]
        );

        assert_eq!(graph.legend[0].category, "Rust");
        assert_eq!(graph.legend[0].color, CATEGORY_COLORS[0]);
        assert_eq!(graph.legend[1].color, CATEGORY_COLORS[1]);
        assert_eq!(graph.nodes[1].color.as_deref(), Some(CATEGORY_COLORS[1]));
    }

    #[test]
    fn palette_cycles_after_twelve_categories() {
        let names: Vec<String> = (0..13).map(|i| format!("c{i}")).collect();
        let posts: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| post(i as u32 + 1, Some(name), None))
            .collect();
        let graph = build_graph(&posts);
        assert_eq!(graph.legend[12].color, CATEGORY_COLORS[0]);
    }
}
