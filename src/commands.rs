use anyhow::{Context, Result};
use chrono::Local;
use llmdesk::config::Config;
use llmdesk::conversation::ConversationClient;
use llmdesk::documents::{DocumentCache, DocumentProcessor};
use llmdesk::illustrate::Illustrator;
use llmdesk::images::{self, ImageRequest};
use llmdesk::llm::OpenAiClient;
use llmdesk::message::ConversationHistory;
use llmdesk::prompts::Persona;
use llmdesk::report;
use llmdesk::session::{ChatSession, DocumentSession};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn prompt_line(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Make sure an API key is available, asking for one when neither the config
/// nor the environment provides it
pub fn ensure_api_key(config: &mut Config) -> Result<()> {
    if config.has_api_key() {
        return Ok(());
    }

    println!("🔑 No API key found in the config or OPENAI_API_KEY.");
    let key = prompt_line("Enter your OpenAI API key: ")?.unwrap_or_default();
    if key.is_empty() {
        anyhow::bail!("An API key is required");
    }
    config.set_api_key(key);

    let save = prompt_line("💾 Save it to ~/.llmdesk/config.toml? [y/N] ")?.unwrap_or_default();
    if save.eq_ignore_ascii_case("y") {
        config.save()?;
        println!("✅ API key saved.");
    }
    Ok(())
}

fn export(config: &Config, title: &str, history: &ConversationHistory) {
    match report::export_report(&config.output_dir(), title, history, Local::now()) {
        Ok(path) => println!("📄 Exported to {}", path.display()),
        Err(e) => println!("❌ Export failed: {e}"),
    }
}

pub fn list_personas() {
    println!("🎭 Available personas:");
    println!("{}", "=".repeat(50));
    for persona in Persona::all() {
        println!("  • {:<18} {}", persona.to_string(), persona.display_name());
    }
}

fn chat_title(persona: Option<Persona>) -> String {
    match persona {
        Some(p) => format!("Chat with {}", p.display_name()),
        None => "Chat".to_string(),
    }
}

/// Argument of a `/persona` command, or `None` when the input is something else
fn persona_argument(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("/persona")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

pub async fn run_chat(config: &Config, persona: Option<Persona>) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let client = ConversationClient::new(backend, config.chat.clone());
    let mut session = ChatSession::new(persona);

    println!("💬 {} ({})", chat_title(persona), config.chat.model);
    println!("Commands: /persona <name|none>, /personas, /clear, /export, /quit");
    println!();

    while let Some(input) = prompt_line("you> ")? {
        if let Some(name) = persona_argument(&input) {
            let next = if name.is_empty() || name == "none" {
                None
            } else {
                match name.parse::<Persona>() {
                    Ok(p) => Some(p),
                    Err(_) => {
                        println!("❌ Unknown persona '{name}'. Run /personas to list them.");
                        continue;
                    }
                }
            };
            session.switch_persona(next);
            println!("🎭 Now chatting as: {}", chat_title(session.persona()));
            continue;
        }

        match input.as_str() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("🧹 History cleared.");
            }
            "/export" => {
                let title = format!(
                    "{} (session {})",
                    chat_title(session.persona()),
                    session.session_id()
                );
                export(config, &title, session.history());
            }
            "/personas" => list_personas(),
            _ => match session.send(&client, &input).await {
                Ok(reply) => println!("\n{reply}\n"),
                Err(e) => println!("❌ Error getting response: {e}"),
            },
        }
    }

    Ok(())
}

fn load_into(session: &mut DocumentSession, processor: &DocumentProcessor, path: &Path) {
    match processor.process_file(path) {
        Ok((document, from_cache)) => {
            let source = if from_cache { "cache" } else { "PDF" };
            println!(
                "📚 Loaded {} from {} ({} words)",
                document.filename,
                source,
                document.word_count()
            );
            session.load(document);
        }
        Err(e) => println!("❌ Could not process {}: {e}", path.display()),
    }
}

pub async fn run_docs(config: &Config, files: &[PathBuf]) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let client = ConversationClient::new(backend, config.documents.clone());
    let processor = DocumentProcessor::new(DocumentCache::new(&config.cache_dir));
    let mut session = DocumentSession::new();

    for path in files {
        load_into(&mut session, &processor, path);
    }

    println!(
        "📚 PDF assistant: {} document(s), {} words",
        session.documents().len(),
        session.total_words()
    );
    println!("Commands: /add <path>, /remove <name>, /list, /clear, /export, /quit");
    println!();

    while let Some(input) = prompt_line("ask> ")? {
        match input.as_str() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_history();
                println!("🧹 History cleared.");
            }
            "/list" => {
                for document in session.documents() {
                    println!("  • {} ({} words)", document.filename, document.word_count());
                }
            }
            "/export" => export(config, "PDF chat", session.history()),
            cmd if cmd.starts_with("/add ") => {
                let path = PathBuf::from(cmd.trim_start_matches("/add ").trim());
                load_into(&mut session, &processor, &path);
            }
            cmd if cmd.starts_with("/remove ") => {
                let name = cmd.trim_start_matches("/remove ").trim();
                if session.remove(name) {
                    println!("🗑️  Removed {name}");
                } else {
                    println!("❌ No document named {name}");
                }
            }
            _ => match session.send(&client, &input).await {
                Ok(reply) => println!("\n{reply}\n"),
                Err(e) => println!("❌ Error getting response: {e}"),
            },
        }
    }

    Ok(())
}

pub async fn run_image(config: &Config, request: ImageRequest, out: Option<PathBuf>) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let dir = out.unwrap_or_else(|| config.output_dir());

    println!("🎨 Generating image... this may take a while");
    let paths = images::generate_and_save(&backend, &request, &dir, Local::now())
        .await
        .context("Error generating image")?;

    println!("✅ Image generated successfully");
    for path in paths {
        println!("  🖼️  {}", path.display());
    }
    println!("Prompt: {}", request.prompt);
    Ok(())
}

pub async fn run_illustrate(
    config: &Config,
    topic: &str,
    frames: usize,
    out: Option<PathBuf>,
) -> Result<()> {
    let backend = OpenAiClient::from_config(config)?;
    let chat = ConversationClient::new(backend.clone(), config.chat.clone());
    let dir = out.unwrap_or_else(|| config.output_dir());

    println!("🎞️  Illustrating '{topic}' in {frames} stage(s)...");
    let illustration = Illustrator::new(&chat, &backend)
        .illustrate(topic, frames)
        .await
        .context("Error generating illustration")?;

    let stamp = images::file_stamp(Local::now());
    for (index, frame) in illustration.frames.iter().enumerate() {
        let bytes = images::image_bytes(&backend, &frame.image)
            .await
            .with_context(|| format!("Error downloading frame {}", index + 1))?;
        let path = images::save_image(&dir, &bytes, &stamp, index)?;
        println!("  {}. {} → {}", index + 1, frame.stage, path.display());
    }

    println!();
    println!("{}", illustration.explanation);
    Ok(())
}
