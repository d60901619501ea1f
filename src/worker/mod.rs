//! The stdin/stdout request loop
//!
//! Requests are handled strictly one at a time, in arrival order. Every
//! input line yields exactly one output line; the first error ends the loop.

mod protocol;
mod token;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::debug;

pub use protocol::{Request, Response};

use crate::engine::{HighlightEngine, HighlightOptions};
use crate::error::{Error, Result};
use crate::render::Structure;
use crate::syntax::Language;
use crate::theme::Theme;

/// The highlighter, possibly still being built on a blocking thread
enum EngineSlot<E> {
    Pending(JoinHandle<Result<E>>),
    Ready(E),
    Failed,
}

impl<E> EngineSlot<E> {
    /// Move the engine out, waiting for it to be built if needed. The slot is
    /// left `Failed` until the engine is put back.
    async fn take(&mut self) -> Result<E> {
        match std::mem::replace(self, EngineSlot::Failed) {
            EngineSlot::Ready(engine) => Ok(engine),
            EngineSlot::Pending(handle) => handle
                .await
                .map_err(|e| Error::EngineInit(e.to_string()))?,
            EngineSlot::Failed => Err(Error::EngineInit(
                "highlighter failed to start".to_string(),
            )),
        }
    }
}

pub struct Worker<E> {
    engine: EngineSlot<E>,
    theme: Arc<Theme>,
    token_aliases: HashMap<String, String>,
    loaded: Option<HashSet<Language>>,
    sum: f64,
}

impl<E: HighlightEngine> Worker<E> {
    /// Start building the engine on a blocking thread and return immediately
    pub fn spawn<F>(init: F, theme: Arc<Theme>, token_aliases: HashMap<String, String>) -> Self
    where
        F: FnOnce() -> Result<E> + Send + 'static,
    {
        Self {
            engine: EngineSlot::Pending(tokio::task::spawn_blocking(init)),
            theme,
            token_aliases,
            loaded: None,
            sum: 0.0,
        }
    }

    /// Serve requests from `reader` until it is exhausted or a request fails
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let response = self.handle_line(&line).await?;

            let mut out = serde_json::to_string(&response).map_err(Error::Serialize)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }

    /// Handle one raw input line
    pub async fn handle_line(&mut self, line: &str) -> Result<Response> {
        let started = Instant::now();
        let request: Request = serde_json::from_str(line).map_err(Error::MalformedRequest)?;

        let html = match request.token_scope() {
            Some(scope) => token::colorize(&request.code, scope, &self.token_aliases, &self.theme),
            None => self.highlight(&request).await?,
        };

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        self.sum += elapsed;
        debug!(lang = %request.lang, inline = request.inline, elapsed, "handled request");

        Ok(Response {
            html,
            elapsed,
            sum: self.sum,
        })
    }

    async fn highlight(&mut self, request: &Request) -> Result<String> {
        let language = Language::from_name(&request.lang)
            .ok_or_else(|| Error::UnknownLanguage(request.lang.clone()))?;
        let structure = if request.inline {
            Structure::Inline
        } else {
            Structure::Classic
        };

        let mut engine = self.engine.take().await?;
        let loaded = self.loaded.take();
        let code = request.code.clone();
        let meta = request.meta.clone();

        // Grammar loading and parsing block, so they run off the reactor
        let (engine, outcome) = tokio::task::spawn_blocking(move || {
            let options = HighlightOptions {
                language,
                structure,
                meta: meta.as_deref(),
            };
            let outcome = render_with(&mut engine, loaded, &code, &options);
            (engine, outcome)
        })
        .await
        .map_err(|e| Error::EngineTask(e.to_string()))?;
        self.engine = EngineSlot::Ready(engine);

        let (loaded, html) = outcome?;
        self.loaded = Some(loaded);

        Ok(if request.inline {
            format!("<code data-pretty-code-figure>{html}</code>")
        } else {
            html
        })
    }
}

/// Load the requested language if it is not in `loaded` yet, then render.
/// Returns the refreshed loaded set alongside the HTML.
fn render_with<E: HighlightEngine>(
    engine: &mut E,
    loaded: Option<HashSet<Language>>,
    code: &str,
    options: &HighlightOptions<'_>,
) -> Result<(HashSet<Language>, String)> {
    let mut loaded = loaded.unwrap_or_else(|| engine.loaded_languages());
    if !loaded.contains(&options.language) {
        engine.load_language(options.language)?;
        loaded = engine.loaded_languages();
    }
    let html = engine.code_to_html(code, options)?;
    Ok((loaded, html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::ThreadId;

    #[derive(Default)]
    struct FakeEngine {
        loaded: HashSet<Language>,
        loads: Arc<AtomicUsize>,
        /// Threads each engine call ran on
        threads: Arc<Mutex<Vec<ThreadId>>>,
        /// Languages whose grammar fails to load
        broken: HashSet<Language>,
    }

    impl FakeEngine {
        fn record_thread(&self) {
            self.threads.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl HighlightEngine for FakeEngine {
        fn loaded_languages(&self) -> HashSet<Language> {
            self.loaded.clone()
        }

        fn load_language(&mut self, language: Language) -> Result<()> {
            self.record_thread();
            if self.broken.contains(&language) {
                return Err(Error::unavailable(language.name(), "not installed"));
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.loaded.insert(language);
            Ok(())
        }

        fn code_to_html(&mut self, code: &str, options: &HighlightOptions<'_>) -> Result<String> {
            self.record_thread();
            Ok(format!(
                "<pre lang=\"{}\" meta=\"{}\">{}</pre>",
                options.language.grammar_name(),
                options.meta.unwrap_or_default(),
                code
            ))
        }
    }

    fn theme() -> Arc<Theme> {
        Arc::new(
            Theme::parse(
                r##"{ "tokenColors": [
                    { "scope": ["meta.declaration.annotation"], "settings": { "foreground": "#c4a7e7" } }
                ] }"##,
            )
            .unwrap(),
        )
    }

    fn aliases() -> HashMap<String, String> {
        crate::config::Settings::default().token_aliases
    }

    fn worker(loads: Arc<AtomicUsize>) -> Worker<FakeEngine> {
        Worker::spawn(
            move || {
                Ok(FakeEngine {
                    loads,
                    ..FakeEngine::default()
                })
            },
            theme(),
            aliases(),
        )
    }

    async fn run(worker: &mut Worker<FakeEngine>, input: &str) -> (Result<()>, Vec<Response>) {
        let mut output = Vec::new();
        let result = worker.run(input.as_bytes(), &mut output).await;
        let responses = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                Response {
                    html: value["html"].as_str().unwrap().to_string(),
                    elapsed: value["elapsed"].as_f64().unwrap(),
                    sum: value["sum"].as_f64().unwrap(),
                }
            })
            .collect();
        (result, responses)
    }

    #[tokio::test]
    async fn one_response_per_request() {
        let mut worker = worker(Arc::default());
        let input = concat!(
            r#"{"lang":"rust","code":"fn main() {}"}"#,
            "\n",
            r#"{"lang":"ts","inline":true,"code":"let x","meta":"title=\"a\""}"#,
            "\n",
        );
        let (result, responses) = run(&mut worker, input).await;
        result.unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].html, "<pre lang=\"rust\" meta=\"\">fn main() {}</pre>");
        assert_eq!(
            responses[1].html,
            "<code data-pretty-code-figure><pre lang=\"typescript\" meta=\"title=\"a\"\">let x</pre></code>"
        );
        assert!(responses.iter().all(|r| r.elapsed >= 0.0));
    }

    #[tokio::test]
    async fn sum_accumulates_elapsed() {
        let mut worker = worker(Arc::default());
        let request = r#"{"lang":"go","code":"package main"}"#;
        let input = format!("{request}\n{request}\n{}\n", r#"{"lang":".fn","code":"x"}"#);
        let (result, responses) = run(&mut worker, &input).await;
        result.unwrap();

        assert_eq!(responses.len(), 3);
        let mut total = 0.0;
        for response in &responses {
            total += response.elapsed;
            assert!((response.sum - total).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn single_token_uses_alias_colour() {
        let mut worker = worker(Arc::default());
        let response = worker
            .handle_line(r#"{"lang":".fn","code":"a < b && c > d"}"#)
            .await
            .unwrap();
        assert_eq!(
            response.html,
            r#"<code data-pretty-code-figure style="color: #c4a7e7">a &lt; b &amp;&amp; c &gt; d</code>"#
        );
    }

    #[tokio::test]
    async fn single_token_without_rule_is_bare() {
        let mut worker = worker(Arc::default());
        let response = worker
            .handle_line(r#"{"lang":".keyword","code":"<if>"}"#)
            .await
            .unwrap();
        assert_eq!(response.html, "&lt;if&gt;");
    }

    #[tokio::test]
    async fn single_token_does_not_wait_for_engine() {
        let mut worker: Worker<FakeEngine> = Worker::spawn(
            || Err(Error::EngineInit("boom".to_string())),
            theme(),
            aliases(),
        );
        let response = worker
            .handle_line(r#"{"lang":".fn","code":"x"}"#)
            .await
            .unwrap();
        assert!(response.html.contains("#c4a7e7"));

        let result = worker.handle_line(r#"{"lang":"rust","code":"x"}"#).await;
        assert!(matches!(result, Err(Error::EngineInit(_))));
    }

    #[tokio::test]
    async fn language_is_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut worker = worker(Arc::clone(&loads));
        let input = concat!(
            r#"{"lang":"rust","code":"a"}"#,
            "\n",
            r#"{"lang":"rs","code":"b"}"#,
            "\n",
            r#"{"lang":"c","code":"c"}"#,
            "\n",
        );
        let (result, responses) = run(&mut worker, input).await;
        result.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_line_stops_the_loop() {
        let mut worker = worker(Arc::default());
        let input = concat!(r#"{"lang":"rust","code":"a"}"#, "\n", "{not json\n", r#"{"lang":"rust","code":"b"}"#, "\n");
        let (result, responses) = run(&mut worker, input).await;

        assert!(matches!(result, Err(Error::MalformedRequest(_))));
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn unknown_language_stops_the_loop() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut worker = worker(Arc::clone(&loads));
        let (result, responses) = run(&mut worker, "{\"lang\":\"cobol\",\"code\":\"x\"}\n").await;

        assert!(matches!(result, Err(Error::UnknownLanguage(lang)) if lang == "cobol"));
        assert!(responses.is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn engine_calls_leave_the_async_thread() {
        let threads = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&threads);
        let mut worker = Worker::spawn(
            move || {
                Ok(FakeEngine {
                    threads: recorded,
                    ..FakeEngine::default()
                })
            },
            theme(),
            aliases(),
        );
        let input = concat!(
            r#"{"lang":"rust","code":"a"}"#,
            "\n",
            r#"{"lang":"rust","code":"b"}"#,
            "\n",
        );
        let (result, responses) = run(&mut worker, input).await;
        result.unwrap();
        assert_eq!(responses.len(), 2);

        let here = std::thread::current().id();
        let threads = threads.lock().unwrap();
        // One load and two renders
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|id| *id != here));
    }

    #[tokio::test]
    async fn engine_survives_a_failed_request() {
        let mut worker = Worker::spawn(
            || {
                Ok(FakeEngine {
                    broken: HashSet::from([Language::Go]),
                    ..FakeEngine::default()
                })
            },
            theme(),
            aliases(),
        );

        let failed = worker.handle_line(r#"{"lang":"go","code":"x"}"#).await;
        assert!(matches!(failed, Err(Error::GrammarUnavailable { .. })));

        let response = worker
            .handle_line(r#"{"lang":"rust","code":"y"}"#)
            .await
            .unwrap();
        assert_eq!(response.html, "<pre lang=\"rust\" meta=\"\">y</pre>");
    }
}
