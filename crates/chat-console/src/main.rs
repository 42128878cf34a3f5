mod cli;
mod command;

use assistant_client::api::ChatLogsQuery;
use assistant_client::{
    AssistantClientConfig, AssistantWidget, ChatApiClient, DispatchError, DispatchReceipt,
    FeedbackError, GuestIdentity, Message, Role, TransitionError, WidgetError, WidgetOptions,
    WidgetPhase,
};
use cli::{CliError, CliOptions, ConsoleMode};
use command::{Command, parse_command};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "chat_console=info,assistant_client=info".to_string()),
        )
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let config = match AssistantClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read assistant config: {err}");
            std::process::exit(1);
        }
    };

    let client = match ChatApiClient::from_config(&config) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build assistant api client: {err}");
            std::process::exit(1);
        }
    };

    let widget_options = WidgetOptions::from_config(&config);
    let widget = match options.mode {
        ConsoleMode::Guest => AssistantWidget::guest(
            client.clone(),
            GuestIdentity::new(
                options.guest_token.clone().unwrap_or_default(),
                options.guest_name.clone(),
            ),
            widget_options,
        ),
        ConsoleMode::Admin => AssistantWidget::admin(
            client.clone(),
            options.wedding_id.clone(),
            options.guest_token.clone(),
            widget_options,
        ),
    };

    info!(
        session_id = %widget.session_id(),
        mode = options.mode.as_str(),
        api_base_url = %config.api_base_url,
        "chat console starting"
    );

    open_widget(&widget).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&widget, &client, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!("failed to read stdin: {err}");
                    break;
                }
            },
        }
    }
}

fn load_dotenv() -> Result<(), String> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(format!("failed to load .env file: {err}")),
    }
}

// Returns false when the console should exit.
async fn handle_line(widget: &AssistantWidget, client: &ChatApiClient, line: &str) -> bool {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(err) => {
            println!("{err}");
            return true;
        }
    };

    match command {
        Command::Empty => {}
        Command::Quit => return false,
        Command::Help => print_commands(),
        Command::Open => open_widget(widget).await,
        Command::Minimize => print_phase(widget.minimize()),
        Command::Restore => {
            print_phase(widget.restore());
            print_quick_questions(widget);
        }
        Command::Close => print_phase(widget.close()),
        Command::History => print_history(widget),
        Command::Logs => print_session_logs(widget, client).await,
        Command::Say(text) => {
            if !ready_for_input(widget) {
                return true;
            }
            if let Err(err) = widget.set_draft(&text) {
                println!("{err}");
                return true;
            }
            let widget = widget.clone();
            tokio::spawn(async move {
                let result = widget.submit_draft().await;
                report_dispatch(&widget, result);
            });
        }
        Command::Quick(number) => {
            if !ready_for_input(widget) {
                return true;
            }
            let Some(prompt) = widget.quick_questions().into_iter().nth(number) else {
                println!("no quick question #{}", number + 1);
                return true;
            };
            println!("you: {prompt}");
            let widget = widget.clone();
            tokio::spawn(async move {
                let result = widget.select_quick_question(&prompt).await;
                report_dispatch(&widget, result);
            });
        }
        Command::Rate { index, helpful } => match widget.record_feedback(index, helpful).await {
            Ok(()) => println!("thanks for the feedback"),
            Err(FeedbackError::NotRateable { index }) => {
                println!("message [{index}] cannot be rated")
            }
            Err(FeedbackError::Submit(_)) => println!("feedback saved locally"),
        },
    }

    true
}

async fn open_widget(widget: &AssistantWidget) {
    match widget.open().await {
        Ok(()) => {}
        Err(WidgetError::SettingsFallback(_)) => {
            info!("assistant settings unavailable, opened with defaults")
        }
        Err(WidgetError::InvalidTransition(err)) => {
            println!("{err}");
            return;
        }
    }

    println!("--- {} ---", widget.display_name());
    print_history(widget);
    print_quick_questions(widget);
}

fn ready_for_input(widget: &AssistantWidget) -> bool {
    if widget.phase() != WidgetPhase::Open {
        println!("the assistant is {}; use /open or /restore first", widget.phase());
        return false;
    }
    if !widget.input_enabled() {
        println!("still waiting for the previous reply");
        return false;
    }
    true
}

fn report_dispatch(widget: &AssistantWidget, result: Result<DispatchReceipt, DispatchError>) {
    let index = match result {
        Ok(receipt) => receipt.assistant_index,
        Err(DispatchError::Remote { fallback_index, .. }) => fallback_index,
        Err(DispatchError::AlreadySending) => {
            println!("still waiting for the previous reply");
            return;
        }
        Err(DispatchError::NotOpen) => {
            println!("the assistant is {}; use /open or /restore first", widget.phase());
            return;
        }
        Err(DispatchError::EmptyMessage) => return,
    };

    if widget.phase() == WidgetPhase::Closed {
        return;
    }
    let display_name = widget.display_name();
    if let Some(message) = widget.messages().get(index) {
        print_message(index, message, &display_name);
    }
    print_quick_questions(widget);
}

fn print_phase(result: Result<WidgetPhase, TransitionError>) {
    match result {
        Ok(phase) => println!("(assistant {phase})"),
        Err(err) => println!("{err}"),
    }
}

fn print_history(widget: &AssistantWidget) {
    let display_name = widget.display_name();
    for (index, message) in widget.messages().iter().enumerate() {
        print_message(index, message, &display_name);
    }
}

fn print_message(index: usize, message: &Message, display_name: &str) {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => display_name,
    };
    let rating = match message.feedback() {
        Some(feedback) => format!(" ({})", feedback.as_str()),
        None if message.is_rateable() => " (rate with /rate)".to_string(),
        None => String::new(),
    };
    println!(
        "[{index}] {} {speaker}: {}{rating}",
        message.timestamp.format("%H:%M"),
        message.content
    );
}

fn print_quick_questions(widget: &AssistantWidget) {
    let questions = widget.quick_questions();
    if questions.is_empty() {
        return;
    }
    println!("quick questions:");
    for (number, question) in questions.iter().enumerate() {
        println!("  /quick {} -> {question}", number + 1);
    }
}

async fn print_session_logs(widget: &AssistantWidget, client: &ChatApiClient) {
    if !client.has_admin_token() {
        println!("set ASSISTANT_ADMIN_TOKEN to view chat logs");
        return;
    }

    match client
        .fetch_chat_logs(&ChatLogsQuery::for_session(widget.session_id()))
        .await
    {
        Ok(page) => {
            println!("{} logged exchanges for {}", page.total, widget.session_id());
            for entry in page.logs {
                let helpful = match entry.was_helpful {
                    Some(true) => "helpful",
                    Some(false) => "not helpful",
                    None => "unrated",
                };
                println!(
                    "  {} [{}] {} -> {} ({helpful})",
                    entry.created_at,
                    entry.topic_detected.as_deref().unwrap_or("general"),
                    entry.user_message,
                    entry.bot_response
                );
            }
        }
        Err(err) => warn!(session_id = %widget.session_id(), "failed to fetch chat logs: {err}"),
    }
}

fn print_commands() {
    println!(
        "Type a message to ask the assistant.\n\
         Commands:\n\
         - /open, /minimize, /restore, /close  Change the assistant window state\n\
         - /quick <n>                          Ask suggested question n\n\
         - /rate <index> up|down               Rate an assistant reply\n\
         - /history                            Show the conversation\n\
         - /logs                               Show server logs for this session (admin token)\n\
         - /quit                               Exit"
    );
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p chat-console -- [--guest-token TOKEN] [--guest-name NAME] [--admin] [--wedding-id ID]\n\
         \n\
         Modes:\n\
         - guest (default): guest portal assistant, requires --guest-token\n\
         - admin: admin console assistant, optional --wedding-id and --guest-token\n\
         \n\
         Environment:\n\
         - ASSISTANT_API_BASE_URL, ASSISTANT_REQUEST_TIMEOUT_MS, ASSISTANT_QUICK_QUESTION_DELAY_MS,\n\
           ASSISTANT_LANGUAGE (en|ar), ASSISTANT_ADMIN_TOKEN\n\
         \n\
         Options:\n\
         - --help  Show this help text"
    );
}
