//! taxally - command-line tax compliance copilot
//!
//! Runs the reasoning loop against Ollama (or a scripted offline provider)
//! with the compliance tools registered and an in-memory state store seeded
//! with a demo user.
//!
//! Commands inside an interactive session:
//! - `tools`   list registered tools
//! - `profile` show the stored state for the current user
//! - `quit`    leave

mod seed;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agent_core::{
    policy::{confirmation_gate, CONFIRMED_KEY},
    Agent, AgentBuilder, AgentConfig, AgentMode, AgentResponse, CallContext, LlmProvider,
    MemoryStateStore, PolicyLayer, SessionId, StateStore, ToolRegistry, TurnStatus,
};
use agent_runtime::{OllamaProvider, ScriptedProvider};
use compliance_advisor::COMPLIANCE_ADVISOR_PROMPT;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    /// Local Ollama server
    Ollama,
    /// Offline keyword-driven replies
    Mock,
}

#[derive(Parser)]
#[command(name = "taxally", about = "Tax compliance copilot for Indian individuals and small businesses", version)]
struct Cli {
    /// LLM backend
    #[arg(long, value_enum, default_value_t = ProviderKind::Ollama)]
    provider: ProviderKind,

    /// Operating mode: individual, micro_business, accountant_assist, compliance_audit
    #[arg(long, default_value = "micro_business", value_parser = parse_mode)]
    mode: AgentMode,

    /// User the session runs as
    #[arg(long, default_value = "demo-user")]
    user: String,

    /// Run the canned demo queries and exit
    #[arg(long)]
    demo: bool,

    /// Send a single message instead of entering interactive mode
    #[arg(short, long)]
    message: Option<String>,

    /// Override the per-turn iteration budget
    #[arg(long, env = "AGENT_MAX_ITERATIONS")]
    max_iterations: Option<usize>,

    /// Abort a turn after this many seconds
    #[arg(long, default_value_t = 300)]
    turn_timeout: u64,

    /// Treat every turn as confirmed by the user
    #[arg(long)]
    auto_confirm: bool,

    /// Print the reasoning trace and tool outcomes
    #[arg(short, long)]
    verbose: bool,
}

fn parse_mode(value: &str) -> Result<AgentMode, String> {
    value.parse().map_err(|e: agent_core::AgentError| e.to_string())
}

/// Everything a session needs between turns
struct Session {
    agent: Agent,
    store: Arc<MemoryStateStore>,
    tools: Arc<ToolRegistry>,
    base: CallContext,
    turn_timeout: Duration,
    verbose: bool,
}

impl Session {
    async fn turn(&self, input: &str) -> anyhow::Result<Option<AgentResponse>> {
        let context = self.base.at(chrono::Utc::now());

        match tokio::time::timeout(self.turn_timeout, self.agent.run(input, &context)).await {
            Ok(result) => Ok(Some(result?)),
            Err(_) => {
                tracing::warn!(session = %context.session_id, "Turn timed out");
                Ok(None)
            }
        }
    }

    fn print_response(&self, response: &AgentResponse) {
        println!();
        for line in response.message.lines() {
            println!("  Assistant > {line}");
        }

        match response.status {
            TurnStatus::Completed => {}
            TurnStatus::BudgetExhausted => {
                println!("  [stopped after {} iterations]", response.iterations);
            }
            TurnStatus::GenerationFailed => println!("  [model unavailable]"),
        }

        if self.verbose {
            println!();
            for step in &response.reasoning_trace {
                println!("  trace | {step}");
            }
            for outcome in &response.tool_results {
                println!("  tool  | {}", outcome.summary());
            }
        }
        println!();
    }

    fn print_tools(&self) {
        println!();
        for schema in self.tools.list() {
            let confirm = if schema.requires_confirmation { " (needs confirmation)" } else { "" };
            println!("  {} [{}]{}", schema.name, schema.category, confirm);
            println!("      {}", schema.description);
        }
        println!();
    }

    async fn print_profile(&self) -> anyhow::Result<()> {
        let state = self.store.get_user_state(&self.base.user_id).await?;
        println!();
        println!("{}", serde_json::to_string_pretty(&state)?);
        println!();
        Ok(())
    }

    async fn ask(&self, input: &str) -> anyhow::Result<()> {
        match self.turn(input).await? {
            Some(response) => self.print_response(&response),
            None => eprintln!("  [Error] no answer within {}s", self.turn_timeout.as_secs()),
        }
        Ok(())
    }
}

async fn build_provider(kind: ProviderKind) -> Arc<dyn LlmProvider> {
    match kind {
        ProviderKind::Mock => Arc::new(ScriptedProvider::new()),
        ProviderKind::Ollama => {
            let provider = OllamaProvider::from_env();
            match provider.health_check().await {
                Ok(true) => tracing::info!(model = provider.model(), "Connected to Ollama"),
                Ok(false) | Err(_) => {
                    tracing::warn!("Ollama not available - turns will fail until it is running");
                    tracing::warn!("  Start it with: ollama serve");
                }
            }
            Arc::new(provider)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let store = Arc::new(MemoryStateStore::new());
    seed::seed_demo_user(&store, &cli.user).await;
    let state: Arc<dyn StateStore> = Arc::clone(&store) as Arc<dyn StateStore>;

    let mut registry = ToolRegistry::new();
    compliance_advisor::register_tools(&mut registry, Arc::clone(&state));
    let tools = Arc::new(registry);
    tracing::info!("Registered {} tools: {}", tools.len(), tools.names().join(", "));

    let policy = PolicyLayer::new().with_policy(confirmation_gate(Arc::clone(&tools)));

    let mut config = AgentConfig::from_env();
    if let Some(max) = cli.max_iterations {
        config.max_iterations = max;
    }

    let agent = AgentBuilder::new()
        .provider(build_provider(cli.provider).await)
        .tools(Arc::clone(&tools))
        .state(state)
        .policy(policy)
        .config(config)
        .guidelines(COMPLIANCE_ADVISOR_PROMPT)
        .build()?;

    let mut base = CallContext::new(cli.user.clone(), SessionId::new(), cli.mode);
    if cli.auto_confirm {
        base = base.with_metadata(CONFIRMED_KEY, serde_json::Value::Bool(true));
    }

    let session = Session {
        agent,
        store,
        tools,
        base,
        turn_timeout: Duration::from_secs(cli.turn_timeout),
        verbose: cli.verbose,
    };

    if cli.demo {
        for query in seed::DEMO_QUERIES {
            println!("  You > {query}");
            session.ask(query).await?;
        }
        return Ok(());
    }

    if let Some(message) = cli.message {
        return session.ask(&message).await;
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║     Tax Compliance Copilot - Interactive     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Mode:     {}", session.base.mode);
    println!("  User:     {}", session.base.user_id);
    println!("  Session:  {}", session.base.session_id);
    println!();
    println!("  Commands: tools, profile, quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "tools" => session.print_tools(),
            "profile" => session.print_profile().await?,
            input => {
                if let Err(e) = session.ask(input).await {
                    eprintln!("  [Error] {e}");
                }
            }
        }
    }

    Ok(())
}
