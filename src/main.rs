use anyhow::Context;
use opener::ai::{ChatBackend, GeminiClient};
use opener::config::{self, Preferences, PreferencesStore, Settings};
use opener::controller::ChatController;
use opener::maps::MapClient;
use opener::platform::{ConsolePlatform, UnavailableMessenger};
use opener::repository::ChatRepository;
use opener::response::ChatResponse;
use opener::session::SessionStore;
use opener::types::ChatMessage;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Bundled defaults used when no .env file is present
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

const HELP: &str = "\
/new                 새 대화
/tabs                대화 목록
/switch <n>          n번째 대화로 이동
/close               현재 대화 닫기
/image <path> [text] 이미지와 함께 전송
/pick <path>         요청된 이미지 선택
/map | /nomap        길찾기 링크 열기 | 일반 답변 받기
/kakao               카카오톡 대화상자 전송
/friends             친구 목록에서 받는 사람 선택
/friend <n>          n번째 친구에게 전송
/login               카카오 로그인
/key <api-key>       API 키 저장
/clear               현재 대화 지우기
/raw                 인코딩된 응답 출력 전환
/quit                종료";

fn load_dotenv() {
    // .env for local runs
    if dotenvy::dotenv().is_ok() {
        return;
    }
    load_bundled_config();
}

fn load_bundled_config() {
    for line in BUNDLED_CONFIG.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            // Only set if not already set (allow env override)
            if std::env::var(key).is_err() {
                // SAFETY: called from main before the runtime starts any threads
                unsafe {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

fn build_backend(settings: &Settings) -> anyhow::Result<Option<Arc<dyn ChatBackend>>> {
    let Some(api_key) = settings.api_key.clone() else {
        tracing::warn!("no API key configured; use /key to set one");
        return Ok(None);
    };
    tracing::info!(key = %config::redact(&api_key), "using Gemini endpoint");
    let client = GeminiClient::new(settings.gemini_endpoint.clone(), api_key, settings.llm_timeout)
        .context("failed to build LLM client")?;
    Ok(Some(Arc::new(client)))
}

struct Repl {
    controller: ChatController,
    preferences: PreferencesStore,
    settings: Settings,
    raw: bool,
}

impl Repl {
    /// Returns false when the user asked to quit.
    async fn handle(&mut self, line: &str) -> anyhow::Result<bool> {
        let before = self.controller.messages().len();
        let active = self.controller.active_id();

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "/quit" | "/exit" => return Ok(false),
            "/help" => println!("{HELP}"),
            "/new" => {
                self.controller.new_session();
            }
            "/tabs" => self.print_tabs(),
            "/switch" => {
                let sessions = self.controller.sessions();
                match rest.parse::<usize>().ok().and_then(|n| sessions.get(n.wrapping_sub(1))) {
                    Some(session) => {
                        self.controller.select_session(&session.id);
                    }
                    None => println!("대화 번호를 확인해주세요."),
                }
            }
            "/close" => {
                self.controller.close_session(&active);
            }
            "/clear" => self.controller.clear_messages(),
            "/raw" => {
                self.raw = !self.raw;
                println!("raw: {}", self.raw);
            }
            "/image" => {
                let (path, text) = rest.split_once(' ').unwrap_or((rest, ""));
                if path.is_empty() {
                    println!("/image <path> [text]");
                } else {
                    self.controller.attach_image(path);
                    let response = self.controller.send_message(text.trim()).await;
                    self.print_response(response.as_ref());
                }
            }
            "/pick" => {
                let response = self.controller.on_image_selected(rest).await;
                self.print_response(response.as_ref());
            }
            "/map" => self.controller.open_map(),
            "/nomap" => {
                let response = self.controller.cancel_map_dialog().await;
                self.print_response(response.as_ref());
            }
            "/kakao" => self.controller.submit_kakao_dialog().await,
            "/friends" => {
                let message = self
                    .controller
                    .ui()
                    .kakao_dialog
                    .as_ref()
                    .map(|draft| draft.message.clone())
                    .unwrap_or_else(|| rest.to_string());
                self.controller.open_friend_picker(&message).await;
            }
            "/friend" => {
                let friend = rest.parse::<usize>().ok().and_then(|n| {
                    self.controller
                        .ui()
                        .friend_picker
                        .as_ref()
                        .and_then(|friends| friends.get(n.wrapping_sub(1)).cloned())
                });
                match friend {
                    Some(friend) => self.controller.send_message_to_friend(&friend).await,
                    None => println!("친구 번호를 확인해주세요."),
                }
            }
            "/login" => {
                self.controller.login_kakao().await;
            }
            "/key" => self.set_key(rest)?,
            _ if command.starts_with('/') => println!("{HELP}"),
            _ => {
                let response = self.controller.send_message(line).await;
                self.print_response(response.as_ref());
            }
        }

        if self.controller.active_id() == active {
            self.print_new_messages(before);
        } else {
            self.print_tabs();
        }
        self.print_prompts();
        Ok(true)
    }

    fn set_key(&mut self, key: &str) -> anyhow::Result<()> {
        if key.is_empty() {
            println!("/key <api-key>");
            return Ok(());
        }
        let mut preferences: Preferences = self.preferences.load_or_default();
        preferences.api_key = Some(key.to_string());
        self.preferences
            .save(&preferences)
            .with_context(|| format!("failed to save {}", self.preferences.path().display()))?;

        self.settings.api_key = Some(key.to_string());
        let backend = build_backend(&self.settings)?;
        self.controller.set_backend(backend);
        println!("API 키가 저장되었습니다.");
        Ok(())
    }

    fn print_response(&self, response: Option<&ChatResponse>) {
        if self.raw
            && let Some(response) = response
        {
            println!("[raw] {}", response.encode());
        }
    }

    fn print_new_messages(&self, before: usize) {
        let messages: Vec<ChatMessage> = self.controller.messages();
        for message in messages.iter().skip(before).filter(|m| !m.is_user) {
            println!("\n{}\n", message.content);
        }
    }

    fn print_tabs(&self) {
        let active = self.controller.active_id();
        for (index, session) in self.controller.sessions().iter().enumerate() {
            let marker = if session.id == active { '*' } else { ' ' };
            println!("{marker} {}. {}", index + 1, session.display_title());
        }
    }

    fn print_prompts(&self) {
        let ui = self.controller.ui();
        if ui.image_picker_open {
            println!("(이미지를 선택하세요: /pick <path>)");
        }
        if ui.map_link.is_some() {
            println!("(지도 열기: /map, 일반 답변: /nomap)");
        }
        if let Some(draft) = &ui.kakao_dialog {
            println!("(카카오톡 전송 준비: \"{}\" - /kakao 또는 /friends)", draft.message);
        }
        if let Some(friends) = &ui.friend_picker {
            for (index, friend) in friends.iter().enumerate() {
                println!("  {}. {}", index + 1, friend.nickname);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let preferences = PreferencesStore::default();
    let settings = Settings::from_env().merge_preferences(&preferences.load_or_default());

    let routes = MapClient::new(&settings.map_endpoint, settings.map_timeout)
        .context("failed to build map client")?;
    let repository = ChatRepository::new(
        SessionStore::new().shared(),
        build_backend(&settings)?,
        Arc::new(routes),
    )
    .with_history_window(settings.history_window);
    let controller = ChatController::new(
        repository,
        Arc::new(UnavailableMessenger),
        Arc::new(ConsolePlatform),
    );

    let mut repl = Repl {
        controller,
        preferences,
        settings,
        raw: false,
    };

    println!("Opener - /help 로 명령어를 확인하세요.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !repl.handle(line).await? {
            break;
        }
    }
    Ok(())
}
