//! Configurator CLI - Bridge interface for the shop frontend
//!
//! Commands: resolve, catalog, encode, quote
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on load failure or an incomplete configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use mattress_configurator::{
    Action, Cart, CartLine, CatalogBundle, ConfigState, Configurator, Height, Session, SessionStatus,
    Size, Slot,
    loader::load_settings,
};

#[derive(Parser)]
#[command(name = "configurator-cli")]
#[command(about = "Mattress Configurator CLI - configuration state engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding layers-config.json, url-mapping.json and layer-descriptions.json
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore a configuration, apply changes and print its view
    Resolve {
        /// Shared path (last segment is the configuration)
        #[arg(short, long)]
        path: Option<String>,

        #[arg(short, long)]
        size: Option<Size>,

        #[arg(long)]
        height: Option<Height>,

        /// Slot assignment, e.g. layer-2=latex or cover=aloe
        #[arg(long = "set", value_parser = parse_assignment)]
        assignments: Vec<(Slot, String)>,
    },

    /// List layers and covers offered at a height
    Catalog {
        #[arg(long)]
        height: Option<Height>,
    },

    /// Print the path segment for an explicit configuration
    Encode {
        #[arg(short, long)]
        size: Size,

        #[arg(long)]
        height: Height,

        /// Layer ids, bottom slot first
        #[arg(short, long = "layer")]
        layers: Vec<String>,

        #[arg(short, long)]
        cover: String,
    },

    /// Put a configuration in a cart and print the cart
    Quote {
        #[arg(short, long)]
        path: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
}

fn parse_assignment(raw: &str) -> Result<(Slot, String), String> {
    let (slot, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <slot>=<id>, got '{}'", raw))?;
    let slot = slot.parse::<Slot>().map_err(|e| e.to_string())?;
    Ok((slot, id.to_string()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(&cli.data_dir) {
        Ok(s) => s,
        Err(e) => return fail(&format!("Failed to load settings: {}", e)),
    };

    // All three catalogs or nothing
    let mut session = Session::new(settings);
    let ticket = session.begin_load();
    let path = match &cli.command {
        Commands::Resolve { path, .. } | Commands::Quote { path, .. } => path.clone(),
        _ => None,
    };
    session.complete_load(ticket, CatalogBundle::load_from_dir(&cli.data_dir), path.as_deref());

    if let SessionStatus::Failed(message) = session.status() {
        return fail(&format!("Failed to load configuration: {}", message));
    }

    match cli.command {
        Commands::Resolve { size, height, assignments, .. } => {
            let mut actions = vec![];
            if let Some(height) = height {
                actions.push(Action::ChangeHeight { height });
            }
            if let Some(size) = size {
                actions.push(Action::ChangeSize { size });
            }
            actions.extend(
                assignments
                    .into_iter()
                    .map(|(slot, item_id)| Action::ChangeSlotItem { slot, item_id }),
            );

            for action in actions {
                if let Err(e) = session.dispatch(action) {
                    return reject(&e.to_string());
                }
            }

            let Some(view) = session.view() else {
                return fail("Engine is not ready");
            };
            print_json(&view);
            if view.complete {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Incomplete or invalid configuration
            }
        }

        Commands::Catalog { height } => {
            let Some(engine) = session.engine() else {
                return fail("Engine is not ready");
            };
            let height = height.unwrap_or(engine.settings().default_height);
            let catalog = engine.catalog();

            let output = serde_json::json!({
                "height": height,
                "slots": mattress_configurator::active_slots(height),
                "layers": catalog.layers_available_at(height)
                    .map(|l| serde_json::json!({"id": l.id, "name": l.name, "slug": l.slug}))
                    .collect::<Vec<_>>(),
                "covers": catalog.covers.iter()
                    .map(|c| serde_json::json!({"id": c.id, "name": c.name}))
                    .collect::<Vec<_>>(),
            });
            print_json(&output);
            ExitCode::SUCCESS
        }

        Commands::Encode { size, height, layers, cover } => {
            let Some(engine) = session.engine() else {
                return fail("Engine is not ready");
            };
            match build_state(engine, size, height, layers, cover) {
                Ok(state) => {
                    print_json(&serde_json::json!({ "path": engine.path(&state) }));
                    ExitCode::SUCCESS
                }
                Err(e) => reject(&e),
            }
        }

        Commands::Quote { quantity, .. } => {
            let (Some(engine), Some(view)) = (session.engine(), session.view()) else {
                return fail("Engine is not ready");
            };

            let mut cart = Cart::new();
            let line = match CartLine::from_view(&view, engine.catalog()) {
                Ok(line) => line,
                Err(e) => return fail(&format!("Failed to build cart line: {}", e)),
            };
            let index = cart.add(line);
            if let Err(e) = cart.update_quantity(index, quantity) {
                return reject(&e.to_string());
            }

            print_json(&serde_json::json!({
                "lines": cart.lines(),
                "total": cart.total(),
                "complete": view.complete,
            }));
            ExitCode::SUCCESS
        }
    }
}

fn build_state(
    engine: &Configurator,
    size: Size,
    height: Height,
    layers: Vec<String>,
    cover: String,
) -> Result<ConfigState, String> {
    let slots: Vec<Slot> = mattress_configurator::active_slots(height)
        .into_iter()
        .filter(Slot::is_layer)
        .collect();
    if layers.len() != slots.len() {
        return Err(format!("{} needs {} layers, got {}", height, slots.len(), layers.len()));
    }

    let mut actions = vec![Action::ChangeHeight { height }, Action::ChangeSize { size }];
    actions.extend(
        slots
            .into_iter()
            .zip(layers)
            .map(|(slot, item_id)| Action::ChangeSlotItem { slot, item_id }),
    );
    actions.push(Action::ChangeSlotItem { slot: Slot::Cover, item_id: cover });

    actions.into_iter().try_fold(engine.default_state(), |state, action| {
        engine.apply(&state, action).map_err(|e| e.to_string())
    })
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn fail(message: &str) -> ExitCode {
    print_json(&serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

fn reject(message: &str) -> ExitCode {
    print_json(&serde_json::json!({ "success": false, "error": message }));
    ExitCode::from(2)
}
