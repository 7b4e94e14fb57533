//! Terminal chat front-end for the `/query` endpoint. History lives only in
//! this process.

use std::io::Write;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::config::settings::ChatSettings;
use crate::llm::ChatMessage;

const UNEXPECTED_RESPONSE: &str = "Sorry, I received an unexpected response.";

pub struct ChatClient {
    client: reqwest::Client,
    api_url: String,
}

impl ChatClient {
    pub fn new(settings: &ChatSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
        })
    }

    /// Always yields displayable text; failures become the fixed error lines.
    pub async fn ask(&self, question: &str) -> String {
        let response = match self
            .client
            .post(&self.api_url)
            .json(&json!({ "question": question }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return format!("Error: A network error occurred. {}", err),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return format!(
                "Error: Could not connect to the API. (Status code: {})",
                status.as_u16()
            );
        }

        match response.json::<Value>().await {
            Ok(body) => body["answer"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| UNEXPECTED_RESPONSE.to_string()),
            Err(err) => {
                tracing::debug!("Undecodable response body: {}", err);
                UNEXPECTED_RESPONSE.to_string()
            }
        }
    }
}

pub struct ChatSession {
    client: ChatClient,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Asks and records both turns.
    pub async fn send(&mut self, question: &str) -> String {
        self.history.push(ChatMessage::user(question));
        let answer = self.client.ask(question).await;
        self.history.push(ChatMessage::assistant(answer.clone()));
        answer
    }

    /// Read-eval-print loop over stdin. `/history` replays the session,
    /// `/exit` (or end of input) quits.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("UTD Campus Assistant");
        println!("Ask about CS graduate tracks, courses, calendars and professor ratings.");
        println!("Commands: /history, /exit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            match input {
                "" => continue,
                "/exit" | "/quit" => break,
                "/history" => {
                    for message in &self.history {
                        println!("[{}] {}", message.role, message.content);
                    }
                }
                question => {
                    println!("Thinking...");
                    let answer = self.send(question).await;
                    println!("{}\n", answer);
                }
            }
        }
        Ok(())
    }
}
