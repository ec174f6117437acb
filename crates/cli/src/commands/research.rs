//! `fieldnote research`: run a goal through the agent loop and report.

use std::io::Write;
use std::sync::Arc;

use fieldnote_config::AppConfig;
use fieldnote_core::event::{DomainEvent, EventBus};
use fieldnote_core::planner::ChainPlanner;
use fieldnote_engine::{ControllerConfig, IterationController, LlmChainPlanner, StaticPlanner};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

use crate::report;

pub async fn run(
    goal: Option<String>,
    max_iterations: Option<usize>,
    no_save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = max_iterations {
        config.engine.max_iterations = max;
        config.validate()?;
    }

    let goal = match goal {
        Some(goal) => goal,
        None => prompt_goal()?,
    };
    let goal = goal.trim().to_string();
    if goal.is_empty() {
        eprintln!("  ❌ Error: Research objective required");
        return Err("empty research goal".into());
    }

    let router = fieldnote_providers::build_from_config(&config);
    let provider = router.default();
    if provider.is_none() {
        eprintln!("  ⚠️  No LLM provider available: running without summarizer or planner.");
        eprintln!("     Set OPENROUTER_API_KEY (or run `fieldnote onboard`) for full reports.\n");
    }

    let registry = Arc::new(fieldnote_agents::default_registry(&config, provider.clone()));
    let chain = fieldnote_engine::select_initial_chain(&goal, &registry.names());

    let planner: Arc<dyn ChainPlanner> = match &provider {
        Some(provider) => Arc::new(
            LlmChainPlanner::new(Arc::clone(provider), &config.default_model)
                .with_retries(config.engine.planner_retries),
        ),
        None => Arc::new(StaticPlanner::new(chain.clone())),
    };

    println!("🔎 Research goal: {goal}");
    println!("   Analysis workflow: {}\n", chain.join(" → "));

    let event_bus = Arc::new(EventBus::default());
    let progress = tokio::spawn(print_progress(event_bus.subscribe()));

    let controller = IterationController::new(registry, planner, event_bus)
        .with_config(ControllerConfig::from_engine(&config.engine));
    let run = controller.execute(&goal, chain).await?;
    // The printer stops on RunFinished, which `execute` always publishes.
    let _ = progress.await;

    let now = chrono::Local::now();
    let text = report::render(&run, now, config.report.text_width);
    println!("{text}");

    if config.report.save && !no_save {
        let path = report::save(&config.report.reports_dir, &goal, &text, now)?;
        println!("✅ Full report saved to {}", path.display());
    }

    Ok(())
}

fn prompt_goal() -> Result<String, Box<dyn std::error::Error>> {
    println!("Example research queries:");
    println!("  - Weather and air quality in New York with recent news");
    println!("  - Next SpaceX launch and conditions at the launch site");
    println!("  - Analyze the market sentiment around electric vehicles\n");
    print!("Enter research objective: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// Print one line per progress event until the run finishes.
async fn print_progress(mut rx: Receiver<Arc<DomainEvent>>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress printer lagged");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        match event.as_ref() {
            DomainEvent::IterationStarted { iteration, chain, .. } => {
                println!("── Iteration {iteration}: {}", chain.join(", "));
            }
            DomainEvent::AgentCompleted {
                agent, duration_ms, ..
            } => println!("   ✅ [{agent}] completed in {duration_ms} ms"),
            DomainEvent::AgentFailed { agent, error, .. } => {
                println!("   ❌ [{agent}] {error}");
            }
            DomainEvent::Evaluated { feedback, .. } => println!("   📋 {feedback}"),
            DomainEvent::ChainReplanned {
                changed, new_chain, ..
            } => {
                if *changed {
                    println!("   🔀 New agent chain: {}", new_chain.join(", "));
                } else {
                    println!("   🔁 No changes to agent chain");
                }
            }
            DomainEvent::PlannerFailed { error, .. } => {
                println!("   ⚠️  Planner failed ({error}); keeping current chain");
            }
            DomainEvent::RunFinished { .. } => return,
        }
    }
}
