//! `info` command implementation.

use factory::{ComponentRegistry, ResolveOptions};

use super::{load_blueprint, FeedPlan};
use crate::cli::InfoArgs;
use crate::error::Result;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = load_blueprint(args.config.as_deref())?;

    let options = ResolveOptions {
        simulate_outputs: true,
    };
    let resolved = ComponentRegistry::with_builtins().resolve_with(&blueprint, options)?;
    let plan = FeedPlan::from_resolved(&resolved);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        plan.print();
    }
    Ok(())
}
