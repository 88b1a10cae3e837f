use crate::data_loader;
use crate::export::AggregationReport;
use crate::graph::{Edge, Graph, Node};
use crate::plan::{ExportFileType, ExportProfileItem, ImportFileType, Plan};
use crate::state::GroupAggregationState;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use tracing::{debug, error, info, warn};

use anyhow::{anyhow, Result};
use csv::StringRecord;

fn plan_dir(plan_file_path: &Path) -> Result<&Path> {
    plan_file_path
        .parent()
        .ok_or_else(|| anyhow!("Plan file has no parent directory"))
}

/// Loads a data file from disk, supporting CSV and TSV formats
fn load_file(file_path: &Path) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let separator = data_loader::separator_for(file_path).inspect_err(|e| {
        error!("Error: {} for {}", e, file_path.display());
    })?;
    let (headers, records) = data_loader::load_records(file_path, separator)?;

    debug!(
        "Loaded {} records with headers: {:?}",
        records.len(),
        headers
    );
    Ok((headers, records))
}

/// Creates a new graph with metadata from the plan
fn create_graph_from_plan(plan: &Plan) -> Graph {
    Graph {
        name: plan
            .meta
            .as_ref()
            .and_then(|meta| meta.name.clone())
            .unwrap_or_else(|| "Unnamed Graph".to_string()),
        ..Default::default()
    }
}

/// Loads data from import profiles into the graph
fn load_data_into_graph(graph: &mut Graph, plan: &Plan, plan_file_path: &Path) -> Result<()> {
    let parent_dir = plan_dir(plan_file_path)?;

    for profile in &plan.import.profiles {
        let import_file_path = parent_dir.join(&profile.filename);
        info!(
            "Importing file: {} as {:?}",
            import_file_path.display(),
            profile.filetype
        );

        let (headers, records) = load_file(&import_file_path)?;

        match profile.filetype {
            ImportFileType::Nodes => {
                data_loader::verify_nodes_headers(&headers)?;
                let node_profile = data_loader::create_node_load_profile(&headers);
                info!("{}", node_profile);
                data_loader::verify_id_column(&records, node_profile.id_column)?;

                for record in &records {
                    let node = Node::from_row(record, &node_profile)
                        .map_err(|e| anyhow!("Error creating node: {}", e))?;
                    graph.nodes.push(node);
                }
            }
            ImportFileType::Edges => {
                data_loader::verify_edges_headers(&headers)?;
                let edge_profile = data_loader::create_edge_load_profile(&headers);
                info!("{}", edge_profile);
                data_loader::verify_id_column(&records, edge_profile.id_column)?;

                for record in &records {
                    let edge = Edge::from_row(record, &edge_profile)
                        .map_err(|e| anyhow!("Error creating edge: {}", e))?;
                    graph.edges.push(edge);
                }
            }
        }
    }

    info!(
        "Graph loaded with {} nodes and {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    Ok(())
}

/// Creates the plan groups that list members and are not imported
fn create_plan_groups(graph: &mut Graph, plan: &Plan) -> Result<()> {
    for group in &plan.groups {
        if graph.get_node(&group.id).is_none() && !group.members.is_empty() {
            let label = group.label.as_deref().unwrap_or(&group.id);
            info!(
                "Creating group {} with {} member(s)",
                group.id,
                group.members.len()
            );
            let change = graph.group_nodes(&group.id, label, &group.members)?;
            debug!("Groups affected: {:?}", change.affected_groups);
        }
    }
    Ok(())
}

/// Attaches edge selections and declares the aggregation rows of every
/// configured group.
fn apply_group_config(
    graph: &mut Graph,
    state: &mut GroupAggregationState,
    plan: &Plan,
) -> Result<()> {
    for edge_config in &plan.edges {
        match graph.edges.iter_mut().find(|e| e.id == edge_config.id) {
            Some(edge) => {
                edge.aggregations.source = edge_config.source.clone();
                edge.aggregations.target = edge_config.target.clone();
            }
            None => warn!("Edge {} not found, ignoring its aggregation selection", edge_config.id),
        }
    }

    for group in &plan.groups {
        match graph.get_node(&group.id) {
            None => {
                warn!("Group {} not found, ignoring its aggregations", group.id);
                continue;
            }
            Some(node) if !node.is_partition => {
                warn!("Node {} is not a group, ignoring its aggregations", group.id);
                continue;
            }
            Some(_) => {}
        }
        let results = state.set_aggregations(graph, &group.id, group.aggregations.clone())?;
        debug!("Group {} has {} aggregation(s)", group.id, results.len());
    }

    Ok(())
}

/// Exports the report to the specified file using the appropriate renderer
fn export_report(report: &AggregationReport, profile: &ExportProfileItem, out_dir: &Path) -> Result<()> {
    let output_path: PathBuf = out_dir.join(&profile.filename);
    info!(
        "Starting export to file: {} using exporter {:?}",
        output_path.display(),
        profile.exporter
    );

    let result = match profile.exporter {
        ExportFileType::JSON => crate::export::to_json::render(report),
        ExportFileType::CSVGroups => crate::export::to_csv_groups::render(report),
    };

    match result {
        Ok(output) => {
            if let Err(e) = crate::common::write_string_to_file(&output_path, &output) {
                error!("Failed to write to file {}: {}", output_path.display(), e);
            }
        }
        Err(e) => {
            error!("Failed to export file {}: {}", output_path.display(), e);
        }
    }

    Ok(())
}

/// Executes a plan once.
///
/// Member-listed plan groups are created before the integrity checks, so
/// imported edges may point at them. Returns `None` when the graph fails
/// those checks, in which case nothing is exported. Unknown aggregate functions abort the run.
pub fn run_plan(plan: &Plan, plan_file_path: &Path) -> Result<Option<AggregationReport>> {
    let mut graph = create_graph_from_plan(plan);
    load_data_into_graph(&mut graph, plan, plan_file_path)?;
    create_plan_groups(&mut graph, plan)?;

    if let Err(errors) = graph.verify_graph_integrity() {
        warn!("Identified {} graph integrity error(s)", errors.len());
        errors.iter().for_each(|e| warn!("{}", e));
        warn!("Not rendering exports");
        return Ok(None);
    }

    let mut state = GroupAggregationState::new();
    apply_group_config(&mut graph, &mut state, plan)?;
    info!("Graph integrity verified : ok - rendering exports");

    let report = AggregationReport::build(&graph, &state);
    let out_dir = plan_dir(plan_file_path)?;
    for profile in &plan.export.profiles {
        export_report(&report, profile, out_dir)?;
    }

    Ok(Some(report))
}

/// Main function to execute a plan, with optional file watching
pub fn execute_plan(plan: String, watch: bool) -> Result<()> {
    info!("Executing plan {}", plan);

    let plan_file_path = Path::new(&plan);
    let path_content = std::fs::read_to_string(plan_file_path)?;
    let plan: Plan = serde_yaml::from_str(&path_content)?;

    debug!("Executing plan: {:?}", plan);
    run_plan(&plan, plan_file_path)?;

    if watch {
        watch_for_changes(&plan, plan_file_path)?;
    }

    Ok(())
}

/// Sets up file watching for input files to re-run the plan on changes
fn watch_for_changes(plan: &Plan, plan_file_path: &Path) -> Result<()> {
    info!("Watching for changes");
    let parent_dir = plan_dir(plan_file_path)?;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    for profile in &plan.import.profiles {
        let path = parent_dir.join(&profile.filename);
        watcher.watch(&path, RecursiveMode::NonRecursive)?;
    }

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                if let EventKind::Modify(_) = event.kind {
                    debug!("File modified {:?}", event.paths);
                    info!("Change detected, recomputing group aggregations");
                    run_plan(plan, plan_file_path)?;
                }
            }
            Ok(Err(e)) => error!("Watch error: {:?}", e),
            Err(e) => {
                error!("Watch channel closed: {:?}", e);
                return Ok(());
            }
        }
    }
}
