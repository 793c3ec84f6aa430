//! Loads compiled dialogue bundles.
//!
//! A bundle (`.colloquy`, protobuf) holds the tree structure and refers to
//! display text by line id. The text itself lives in a CSV string table next
//! to it, so it can be localised without recompiling the bundle.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::*;
use prost::Message;
use serde::Deserialize;

use crate::colloquy_proto as proto;
use crate::errors::{DialogueError, Result};
use crate::tree::{Answer, AudioClip, DialogueNode, DialogueTree, MultipleChoiceNode, TreeRegistry};

#[derive(Debug, Clone, Deserialize)]
pub struct LineInfo {
    pub id: String,
    pub text: String,
    pub tree: String,
    #[serde(rename = "lineNumber")]
    pub line_number: u32,
}

pub fn read_string_table(path: impl AsRef<Path>) -> Result<Vec<LineInfo>> {
    let mut reader = csv::Reader::from_path(path)?;
    let lines = reader.deserialize().collect::<std::result::Result<Vec<LineInfo>, _>>()?;
    Ok(lines)
}

/// Reads `<name>.colloquy` and its string table `<name>.csv`.
pub fn load_from_paths(bundle_path: impl AsRef<Path>) -> Result<TreeRegistry> {
    let bundle_path = bundle_path.as_ref();
    let data = fs::read(bundle_path)?;

    let csv_path = bundle_path.with_extension("csv");
    let string_table = read_string_table(&csv_path)?;

    load_bundle(&data, &string_table)
}

pub fn load_bundle(data: &[u8], string_table: &[LineInfo]) -> Result<TreeRegistry> {
    let bundle = proto::Bundle::decode(data)?;

    let text: HashMap<&str, &str> = string_table
        .iter()
        .map(|line| (line.id.as_str(), line.text.as_str()))
        .collect();
    let lookup = |line_id: &str| -> Result<String> {
        text.get(line_id)
            .map(|text| text.to_string())
            .ok_or_else(|| DialogueError::MissingLine {
                line_id: line_id.to_string(),
            })
    };

    let mut clips = HashMap::with_capacity(bundle.clips.len());
    for (key, clip) in &bundle.clips {
        let name = if clip.name.is_empty() { key } else { &clip.name };
        let duration = clip_duration(name, clip.duration)?;
        clips.insert(key.as_str(), AudioClip::new(name.clone(), duration));
    }

    let mut registry = TreeRegistry::new();
    for (id, tree) in &bundle.trees {
        let mut nodes = Vec::with_capacity(tree.nodes.len());
        for node in &tree.nodes {
            let clip = match node.clip.as_str() {
                "" => None,
                name => Some(
                    clips
                        .get(name)
                        .cloned()
                        .ok_or_else(|| DialogueError::MissingClip { clip: name.to_string() })?,
                ),
            };
            nodes.push(DialogueNode {
                speaker: node.speaker.clone(),
                text: lookup(&node.line_id)?,
                clip,
            });
        }

        let branch = match &tree.branch {
            Some(branch) => {
                let mut choice = MultipleChoiceNode::new(lookup(&branch.question_line_id)?);
                for answer in &branch.answers {
                    choice = choice.with_answer(Answer::new(lookup(&answer.line_id)?, answer.response_tree.as_str()));
                }
                Some(choice)
            }
            None => None,
        };

        let successor = match tree.successor.as_str() {
            "" => None,
            successor => Some(successor.into()),
        };

        registry.insert(
            id.as_str(),
            DialogueTree {
                nodes,
                branch,
                successor,
            },
        );
    }

    debug!("Loaded {} dialogue trees", registry.len());

    Ok(registry)
}

/// Missing or negative durations count as zero. Ones too long for a
/// `Duration` are rejected.
fn clip_duration(clip: &str, seconds: f32) -> Result<Duration> {
    if seconds.is_nan() || seconds <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f32(seconds).map_err(|_| DialogueError::BadClipDuration {
        clip: clip.to_string(),
        seconds,
    })
}
