//! Stone Breaker entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlInputElement, KeyboardEvent, MouseEvent};

    use stone_breaker::assistant::fetch::FetchTransport;
    use stone_breaker::assistant::{ChatMessage, MentorClient};
    use stone_breaker::audio::{AudioManager, SoundEffect};
    use stone_breaker::chatlog::ChatLog;
    use stone_breaker::consts::*;
    use stone_breaker::content;
    use stone_breaker::settings::Settings;
    use stone_breaker::sim::{self, GamePhase, GameState, ParticleColor, RoundEvent};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        audio: AudioManager,
        accumulator: f32,
        last_time: f64,
        /// Frame loop active; cleared on exit and outside the falling phase
        running: bool,
        raf_id: Option<i32>,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.set_muted(!settings.sound_enabled);
            audio.set_master_volume(settings.master_volume);
            audio.set_sfx_volume(settings.sfx_volume);

            let state = GameState::new(content::default_bank(), seed)
                .expect("built-in question bank is never empty");

            Self {
                state,
                settings,
                audio,
                accumulator: 0.0,
                last_time: 0.0,
                running: false,
                raf_id: None,
            }
        }

        /// Run fixed-timestep simulation frames
        fn update(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                (((time - self.last_time) / 1000.0) as f32).min(0.1)
            } else {
                0.0
            };
            self.last_time = time;
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                sim::advance(&mut self.state, 1);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }

            for event in self.state.drain_events() {
                match event {
                    RoundEvent::CorrectHit { streak } => {
                        self.audio.play(SoundEffect::CorrectHit { streak })
                    }
                    RoundEvent::WrongHit => self.audio.play(SoundEffect::WrongHit),
                    RoundEvent::RoundComplete => self.audio.play(SoundEffect::RoundClear),
                    RoundEvent::GameComplete => self.audio.play(SoundEffect::GameComplete),
                }
            }
        }

        /// Push current state into the DOM
        fn render(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            self.render_tokens(&document);
            self.render_particles(&document);
            self.update_hud(&document);
        }

        fn render_tokens(&self, document: &Document) {
            for token in &self.state.tokens {
                let Some(el) = document.get_element_by_id(&format!("token-{}", token.id))
                else {
                    continue;
                };

                let class = if token.destroyed {
                    "token destroyed"
                } else if token.hit {
                    "token revealed"
                } else {
                    "token"
                };
                let _ = el.set_attribute("class", class);

                let rotation = if self.settings.reduced_motion {
                    0.0
                } else {
                    token.rotation
                };
                let style = format!(
                    "left:{:.2}%;top:{:.2}%;opacity:{:.2};min-width:{}px;\
                     transform:translate(-50%,-50%) rotate({:.1}deg);",
                    token.pos.x, token.pos.y, token.opacity, token.size as u32, rotation
                );
                let _ = el.set_attribute("style", &style);
            }
        }

        fn render_particles(&self, document: &Document) {
            let Some(layer) = document.get_element_by_id("particle-layer") else {
                return;
            };
            if self.settings.max_particles() == 0 {
                layer.set_inner_html("");
                return;
            }

            let mut html = String::new();
            for particle in &self.state.particles {
                let color = match particle.color {
                    ParticleColor::Green => "hsl(142, 76%, 36%)",
                    ParticleColor::Red => "hsl(0, 84%, 60%)",
                };
                let alpha = particle.life as f32 / particle.max_life as f32;
                html.push_str(&format!(
                    "<div class=\"particle\" style=\"left:{:.2}%;top:{:.2}%;\
                     width:{:.1}px;height:{:.1}px;background:{};opacity:{:.2}\"></div>",
                    particle.pos.x, particle.pos.y, particle.size, particle.size, color, alpha
                ));
            }
            layer.set_inner_html(&html);
        }

        /// Update HUD elements and phase overlays in the DOM
        fn update_hud(&self, document: &Document) {
            let set_text = |id: &str, value: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(value));
                }
            };

            set_text("hud-score", &self.state.score.to_string());
            set_text("hud-streak", &self.state.streak.to_string());
            set_text("hud-best", &self.state.best_streak.to_string());
            set_text(
                "hud-question",
                &format!(
                    "Q{}/{}",
                    self.state.question_index + 1,
                    self.state.question_count()
                ),
            );

            let show = |id: &str, visible: bool| {
                if let Some(el) = document.get_element_by_id(id) {
                    let _ = el.set_attribute(
                        "class",
                        if visible { "overlay" } else { "overlay hidden" },
                    );
                }
            };
            show(
                "question-screen",
                self.state.phase == GamePhase::Question,
            );
            show("round-complete", self.state.phase == GamePhase::Complete);
            show("final-screen", self.state.phase == GamePhase::Final);

            match self.state.phase {
                GamePhase::Question => {
                    set_text("question-text", &self.state.question().prompt);
                }
                GamePhase::Complete => {
                    set_text("stat-correct", &self.state.correct_hits.to_string());
                    set_text("stat-missed", &self.state.missed.to_string());
                    set_text("stat-streak", &self.state.streak.to_string());
                    set_text("round-explanation", &self.state.question().explanation);
                    set_text(
                        "next-btn",
                        if self.state.question_index + 1 < self.state.question_count() {
                            "Next Challenge"
                        } else {
                            "View Final Results"
                        },
                    );
                }
                GamePhase::Final => {
                    set_text("final-score", &self.state.score.to_string());
                    set_text("final-streak", &self.state.best_streak.to_string());
                    set_text(
                        "final-accuracy",
                        &format!("{:.1}%", self.state.accuracy()),
                    );
                    set_text("final-rank", self.state.rank().title());
                }
                GamePhase::Falling => {}
            }

            // Falling question reminder under the play area
            set_text("question-reminder", &self.state.question().prompt);
        }
    }

    /// Create the DOM elements for this round's tokens
    fn build_token_elements(game: &Game) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(layer) = document.get_element_by_id("token-layer") else {
            return;
        };
        layer.set_inner_html("");

        for token in &game.state.tokens {
            let Ok(el) = document.create_element("div") else {
                continue;
            };
            el.set_id(&format!("token-{}", token.id));
            let _ = el.set_attribute("class", "token");
            let _ = el.set_attribute("data-token", &token.id.to_string());
            el.set_text_content(Some(&token.text));
            let _ = layer.append_child(&el);
        }
    }

    /// Start the frame loop if it is not already running
    fn start_frame_loop(game: Rc<RefCell<Game>>) {
        if game.borrow().running {
            return;
        }
        game.borrow_mut().running = true;

        let callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> =
            Rc::new(RefCell::new(None));
        let callback_inner = callback.clone();
        let game_inner = game.clone();

        *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
            let keep_running = {
                let mut g = game_inner.borrow_mut();
                if g.running {
                    g.update(time);
                    // The loop only serves the falling phase; stop as soon
                    // as the round settles
                    if g.state.phase != GamePhase::Falling {
                        g.running = false;
                        g.raf_id = None;
                    }
                }
                g.running
            };
            game_inner.borrow().render();

            if keep_running {
                let id = schedule(callback_inner.borrow().as_ref().unwrap());
                game_inner.borrow_mut().raf_id = id;
            } else {
                // Drop the self-referencing closure so nothing dangles
                callback_inner.borrow_mut().take();
            }
        }));

        let id = schedule(callback.borrow().as_ref().unwrap());
        game.borrow_mut().raf_id = id;
    }

    fn schedule(callback: &Closure<dyn FnMut(f64)>) -> Option<i32> {
        web_sys::window()
            .and_then(|w| w.request_animation_frame(callback.as_ref().unchecked_ref()).ok())
    }

    /// Stop the frame loop immediately (exit semantics)
    fn stop_frame_loop(game: &Rc<RefCell<Game>>) {
        let mut g = game.borrow_mut();
        g.running = false;
        if let Some(id) = g.raf_id.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(id);
            }
        }
        g.accumulator = 0.0;
        g.last_time = 0.0;
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Stone Breaker starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));
        log::info!("Game initialized with seed: {}", seed);

        let chat_log = Rc::new(RefCell::new(ChatLog::load()));
        let mentor = Rc::new(match FetchTransport::from_env() {
            Ok(transport) => Some(MentorClient::new(transport)),
            Err(err) => {
                log::warn!("Mentor widget disabled: {err}");
                None
            }
        });

        setup_launch_button(game.clone());
        setup_hit_handler(game.clone());
        setup_next_button(game.clone());
        setup_restart_button(game.clone());
        setup_exit_button(game.clone());
        setup_sound_button(game.clone());
        setup_chat(game.clone(), chat_log.clone(), mentor);

        render_chat(&chat_log.borrow());
        game.borrow().render();

        log::info!("Stone Breaker running!");
    }

    fn setup_launch_button(game: Rc<RefCell<Game>>) {
        let Some(btn) = element_by_id("launch-btn") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            {
                let mut g = game.borrow_mut();
                // Audio needs a user gesture to unlock
                g.audio.resume();
                sim::start_round(&mut g.state);
                build_token_elements(&g);
            }
            game.borrow().render();
            if game.borrow().state.phase == GamePhase::Falling {
                start_frame_loop(game.clone());
            }
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// One delegated click handler covers every token element
    fn setup_hit_handler(game: Rc<RefCell<Game>>) {
        let Some(area) = element_by_id("game-area") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok())
            else {
                return;
            };
            let Ok(Some(token_el)) = target.closest("[data-token]") else {
                return;
            };
            let Some(id) = token_el
                .get_attribute("data-token")
                .and_then(|v| v.parse::<u32>().ok())
            else {
                return;
            };
            let mut g = game.borrow_mut();
            sim::hit_token(&mut g.state, id);
        });
        let _ = area.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_next_button(game: Rc<RefCell<Game>>) {
        let Some(btn) = element_by_id("next-btn") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            {
                let mut g = game.borrow_mut();
                sim::next_question(&mut g.state);
            }
            game.borrow().render();
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(btn) = element_by_id("restart-btn") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            {
                let mut g = game.borrow_mut();
                sim::reset(&mut g.state);
            }
            game.borrow().render();
            log::info!("Game restarted");
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Exiting mid-round halts the loop at once and rolls the round back
    fn setup_exit_button(game: Rc<RefCell<Game>>) {
        let Some(btn) = element_by_id("exit-btn") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            stop_frame_loop(&game);
            {
                let mut g = game.borrow_mut();
                sim::abort_round(&mut g.state);
            }
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                if let Some(layer) = document.get_element_by_id("token-layer") {
                    layer.set_inner_html("");
                }
                if let Some(layer) = document.get_element_by_id("particle-layer") {
                    layer.set_inner_html("");
                }
            }
            game.borrow().render();
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_sound_button(game: Rc<RefCell<Game>>) {
        let Some(btn) = element_by_id("sound-btn") else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            g.settings.sound_enabled = !g.settings.sound_enabled;
            g.settings.save();
            let muted = !g.settings.sound_enabled;
            g.audio.set_muted(muted);
            if let Some(btn) = element_by_id("sound-btn") {
                btn.set_text_content(Some(if muted { "🔇" } else { "🔊" }));
            }
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_chat(
        game: Rc<RefCell<Game>>,
        chat_log: Rc<RefCell<ChatLog>>,
        mentor: Rc<Option<MentorClient<FetchTransport>>>,
    ) {
        let send = {
            let game = game.clone();
            let chat_log = chat_log.clone();
            let mentor = mentor.clone();
            move || {
                let Some(input) = element_by_id("chat-input")
                    .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                else {
                    return;
                };
                let text = input.value().trim().to_string();
                if text.is_empty() {
                    return;
                }
                input.set_value("");

                {
                    let mut log = chat_log.borrow_mut();
                    log.push(ChatMessage::user(text));
                    log.save();
                    render_chat(&log);
                }

                if mentor.is_none() {
                    let mut log = chat_log.borrow_mut();
                    log.push(ChatMessage::assistant(
                        "The mentor is offline - no answer service is configured.",
                    ));
                    render_chat(&log);
                    return;
                }

                let context = format!("Question: {}", game.borrow().state.question().prompt);
                let chat_log = chat_log.clone();
                let mentor = mentor.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let Some(client) = (*mentor).as_ref() else { return };
                    let history = chat_log.borrow().messages.clone();
                    let reply = match client.get_completion(&history, Some(&context)).await {
                        Ok(reply) => reply,
                        Err(err) => {
                            log::warn!("Mentor request failed after retries: {err}");
                            "I can't reach the mentor service right now - \
                             please try again in a moment."
                                .to_string()
                        }
                    };
                    let mut log = chat_log.borrow_mut();
                    log.push(ChatMessage::assistant(reply));
                    log.save();
                    render_chat(&log);
                });
            }
        };

        if let Some(btn) = element_by_id("chat-send") {
            let send = send.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| send());
            let _ =
                btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(input) = element_by_id("chat-input") {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" {
                    send();
                }
            });
            let _ = input
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn render_chat(chat_log: &ChatLog) {
        let Some(list) = element_by_id("chat-messages") else { return };
        let mut html = String::new();
        for message in &chat_log.messages {
            let class = match message.role {
                stone_breaker::assistant::Role::User => "msg user",
                _ => "msg assistant",
            };
            html.push_str(&format!(
                "<div class=\"{}\">{}</div>",
                class,
                escape_html(&message.content)
            ));
        }
        list.set_inner_html(&html);
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    fn element_by_id(id: &str) -> Option<Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Stone Breaker (native) starting...");
    log::info!("Native mode has no renderer - run with `trunk serve` for the web version");

    // Smoke-run one auto-played game so the engine is exercised natively
    run_autoplay();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn run_autoplay() {
    use stone_breaker::content;
    use stone_breaker::sim::{self, GamePhase, GameState};

    let mut state =
        GameState::new(content::default_bank(), 0xC0FFEE).expect("bank is not empty");

    while state.phase != GamePhase::Final {
        sim::start_round(&mut state);
        let correct: Vec<u32> = state
            .tokens
            .iter()
            .filter(|t| t.is_correct)
            .map(|t| t.id)
            .collect();
        for id in correct {
            sim::advance(&mut state, 10);
            sim::hit_token(&mut state, id);
        }
        sim::advance(&mut state, 1);
        assert_eq!(state.phase, GamePhase::Complete, "round must settle");
        sim::next_question(&mut state);
    }

    println!(
        "Autoplay finished: score {} best streak {} accuracy {:.1}% rank {}",
        state.score,
        state.best_streak,
        state.accuracy(),
        state.rank().title()
    );
}
