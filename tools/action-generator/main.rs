use clap::Parser;
use itertools::Itertools;
use nagare::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::sync::Arc;

/// A CLI tool to generate random, valid action scripts for the nagare CLI
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_actions.json")]
    output: String,

    /// The number of actions to attempt after the start element is placed
    #[arg(short, long, default_value_t = 50)]
    count: usize,

    /// Seed for the random generator; the same seed produces the same script
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

const LEAF_TYPES: [&str; 4] = [
    element_type::ASSIGNMENT,
    element_type::ACTION_CALL,
    element_type::RECORD_CREATE,
    element_type::RECORD_LOOKUP,
];

/// Every candidate action is dispatched against a scratch store and only kept when
/// the store accepts it, so the script always replays cleanly.
struct Generator {
    rng: StdRng,
    store: FlowStore,
    script: Vec<Action>,
    counter: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    println!("Generating an action script ({} attempts, seed {})...", cli.count, cli.seed);

    let mut generator = Generator::new(cli.seed);
    generator.try_dispatch(Action::AddStartElement(
        FlowElement::canvas("start", element_type::START).with_label("Start"),
    ));
    let mut rejected = 0;
    for _ in 0..cli.count {
        let action = generator.next_action();
        if !generator.try_dispatch(action) {
            rejected += 1;
        }
    }

    let json_output = serde_json::to_string_pretty(&generator.script)?;
    fs::write(&cli.output, json_output)?;

    println!("-> Kept {} action(s), discarded {}.", generator.script.len(), rejected);
    println!("Successfully generated and saved the script to '{}'", cli.output);
    Ok(())
}

impl Generator {
    fn new(seed: u64) -> Self {
        let store = FlowStore::builder()
            .with_config(StoreConfig::default().with_assertions(true))
            .with_guid_generator(Arc::new(SequentialGuidGenerator::default()))
            .build();
        Self {
            rng: StdRng::seed_from_u64(seed),
            store,
            script: Vec::new(),
            counter: 0,
        }
    }

    fn try_dispatch(&mut self, action: Action) -> bool {
        match self.store.dispatch(action.clone()) {
            Ok(_) => {
                self.script.push(action);
                true
            }
            Err(e) => {
                log::debug!("Discarding {}: {}", action.type_name(), e);
                false
            }
        }
    }

    fn fresh_guid(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }

    fn next_action(&mut self) -> Action {
        match self.rng.random_range(0..100) {
            0..=34 => self.add_leaf(),
            35..=49 => self.add_decision(),
            50..=54 => self.add_end(),
            55..=64 => self.delete(),
            65..=71 => self.add_fault(),
            72..=79 => self.create_goto(),
            80..=84 => self.modify_decision(),
            85..=89 => Action::Undo,
            90..=94 => self.select(),
            _ => self.decorate(),
        }
    }

    /// Guids of placed canvas elements this generator created, in a stable order.
    fn placed(&self, filter: impl Fn(&FlowElement) -> bool) -> Vec<Guid> {
        self.store
            .state()
            .elements
            .iter()
            .filter(|(_, e)| e.is_canvas_element && e.node_type.is_some() && !e.is_end())
            .filter(|(_, e)| filter(e))
            .map(|(guid, _)| guid.clone())
            .sorted()
            .collect()
    }

    fn random_slot(&mut self) -> ConnectionSource {
        let candidates = self.placed(|_| true);
        let Some(guid) = candidates.choose(&mut self.rng).cloned() else {
            return ConnectionSource::next("start");
        };
        let branches = self
            .store
            .state()
            .elements
            .get(&guid)
            .and_then(|e| e.children.as_ref().map(Vec::len))
            .unwrap_or(0);
        if branches > 0 && self.rng.random_bool(0.6) {
            ConnectionSource::branch(guid, self.rng.random_range(0..branches))
        } else {
            ConnectionSource::next(guid)
        }
    }

    fn add_leaf(&mut self) -> Action {
        let kind = *LEAF_TYPES.choose(&mut self.rng).unwrap_or(&element_type::ASSIGNMENT);
        let guid = self.fresh_guid("leaf");
        let label = format!("Step {}", self.counter);
        Action::AddCanvasElement(AddElementPayload {
            element: FlowElement::canvas(&guid, kind)
                .with_name(label.replace(' ', "_"))
                .with_label(label),
            alc_connection_source: Some(self.random_slot()),
        })
    }

    fn add_end(&mut self) -> Action {
        let guid = self.fresh_guid("end");
        Action::AddEndElement(AddElementPayload {
            element: FlowElement::canvas(&guid, element_type::END),
            alc_connection_source: Some(self.random_slot()),
        })
    }

    fn add_decision(&mut self) -> Action {
        let guid = self.fresh_guid("decision");
        let outcomes = self.rng.random_range(1..=3);
        let children: Vec<FlowElement> = (0..outcomes)
            .map(|i| FlowElement::new(format!("{guid}-outcome-{i}"), element_type::OUTCOME).with_label(format!("Outcome {i}")))
            .collect();
        Action::AddDecisionWithOutcomes(ElementWithChildrenPayload {
            canvas_element: FlowElement::canvas(&guid, element_type::DECISION)
                .with_label(format!("Decision {}", self.counter))
                .with_child_references(children.iter().map(|c| c.guid.clone())),
            child_elements: children,
            deleted_child_elements: Vec::new(),
            alc_connection_source: Some(self.random_slot()),
        })
    }

    fn modify_decision(&mut self) -> Action {
        let decisions = self.placed(|e| e.node_type == Some(NodeType::Decision));
        let Some(guid) = decisions.choose(&mut self.rng).cloned() else {
            return self.add_decision();
        };
        let Some(decision) = self.store.state().elements.get(&guid).cloned() else {
            return self.add_decision();
        };
        let mut kept: Vec<Guid> = decision.child_reference_guids().cloned().collect();
        let mut deleted = Vec::new();
        if kept.len() > 1 && self.rng.random_bool(0.5) {
            let index = self.rng.random_range(0..kept.len());
            deleted.push(FlowElement::new(kept.remove(index), element_type::OUTCOME));
        }
        let added = self.fresh_guid("outcome");
        kept.push(added);

        let elements = &self.store.state().elements;
        let children = kept
            .iter()
            .map(|child| match elements.get(child) {
                Some(existing) => existing.clone(),
                None => FlowElement::new(child, element_type::OUTCOME).with_label(format!("Outcome {}", self.counter)),
            })
            .collect();
        Action::ModifyDecisionWithOutcomes(ElementWithChildrenPayload {
            canvas_element: FlowElement::canvas(&guid, element_type::DECISION).with_child_references(kept),
            child_elements: children,
            deleted_child_elements: deleted,
            alc_connection_source: None,
        })
    }

    fn delete(&mut self) -> Action {
        let candidates = self.placed(|e| e.node_type != Some(NodeType::Start));
        let Some(guid) = candidates.choose(&mut self.rng).cloned() else {
            return self.add_leaf();
        };
        let branches = self
            .store
            .state()
            .elements
            .get(&guid)
            .and_then(|e| e.children.as_ref().map(Vec::len))
            .unwrap_or(0);
        let child_index_to_keep = (branches > 0 && self.rng.random_bool(0.5)).then(|| self.rng.random_range(0..branches));
        Action::DeleteElement(DeleteElementPayload {
            selected_elements: vec![guid],
            connectors_to_delete: Vec::new(),
            element_type: None,
            child_index_to_keep,
        })
    }

    fn add_fault(&mut self) -> Action {
        let registry = self.store.registry();
        let candidates = self.placed(|e| {
            e.fault.is_none() && registry.get(&e.element_type).is_some_and(|config| config.supports_fault())
        });
        match candidates.choose(&mut self.rng) {
            Some(guid) => Action::AddFault(ElementRef::new(guid.clone())),
            None => self.add_leaf(),
        }
    }

    /// Replaces an End that closes one of our elements' slots with a goto.
    fn create_goto(&mut self) -> Action {
        let elements = &self.store.state().elements;
        let ends_after = self.placed(|e| e.next.as_deref().and_then(|next| elements.get(next)).is_some_and(FlowElement::is_end));
        let targets = self.placed(|e| e.node_type != Some(NodeType::Start));
        let (Some(source), Some(target)) = (ends_after.choose(&mut self.rng).cloned(), targets.choose(&mut self.rng).cloned())
        else {
            return self.add_leaf();
        };
        Action::CreateGotoConnection(CreateGotoPayload {
            source: ConnectionSource::next(source),
            target,
            is_reroute: false,
        })
    }

    fn select(&mut self) -> Action {
        let candidates = self.placed(|_| true);
        match candidates.choose(&mut self.rng) {
            Some(guid) => Action::SelectOnCanvas(ElementRef::new(guid.clone())),
            None => Action::DeselectOnCanvas,
        }
    }

    fn decorate(&mut self) -> Action {
        let decisions = self.placed(|e| e.node_type == Some(NodeType::Decision));
        match decisions.choose(&mut self.rng) {
            Some(guid) => Action::DecorateCanvas(DecorateCanvasPayload {
                connectors_to_highlight: vec![ConnectorKey::new(guid.clone(), ConnectorType::Default)],
            }),
            None => Action::ClearCanvasDecoration,
        }
    }
}
