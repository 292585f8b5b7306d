mod api;
mod app;
mod config;
mod content;
mod models;
mod reader;
mod store;
mod ui;

use anyhow::Result;
use app::{App, AppView};
use config::AppConfig;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reader::prefs::ReadMode;
use std::{io, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::load().unwrap_or_default();
    let mut app = App::new(config)?;
    app.init().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> Result<()> {
    loop {
        terminal
            .draw(|f| ui::render(f, &mut app))
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let frame_height = terminal
            .size()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .height;
        let reader_rows = ui::reader::content_rows(frame_height) as usize;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Resize(_, _) => app.engine.note_resize(),
                Event::Key(key) => {
                    app.status = None;
                    match app.view {
                        AppView::Stories | AppView::MyStories => match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            KeyCode::Down | KeyCode::Char('j') => app.select_next_story(),
                            KeyCode::Up | KeyCode::Char('k') => app.select_prev_story(),
                            KeyCode::Enter => app.open_selected_story().await,
                            KeyCode::Char('m') => app.load_my_stories().await,
                            KeyCode::Char('b') => app.load_stories().await,
                            KeyCode::Char('n') => {
                                if app.is_logged_in() {
                                    app.view = AppView::StoryForm;
                                } else {
                                    app.set_status("Please sign in to publish.");
                                    app.view = AppView::Login;
                                }
                            }
                            KeyCode::Char('x') => {
                                if app.view == AppView::MyStories {
                                    app.delete_selected_story().await;
                                }
                            }
                            KeyCode::Char('L') => app.view = AppView::Login,
                            KeyCode::Char('R') => app.logout(),
                            KeyCode::Char('T') => app.toggle_theme(),
                            KeyCode::Char('D') => app.toggle_dark(),
                            KeyCode::Char('?') => {
                                app.previous_view = Some(app.view);
                                app.view = AppView::Help;
                            }
                            _ => {}
                        },
                        AppView::Story => match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => {
                                if app.showing_mine {
                                    app.load_my_stories().await;
                                } else {
                                    app.load_stories().await;
                                }
                            }
                            KeyCode::Down | KeyCode::Char('j') => app.select_next_chapter(),
                            KeyCode::Up | KeyCode::Char('k') => app.select_prev_chapter(),
                            KeyCode::Enter => app.open_selected_chapter().await,
                            KeyCode::Char('a') => {
                                if app.is_logged_in() {
                                    app.open_chapter_form();
                                } else {
                                    app.set_status("Please sign in to publish.");
                                    app.view = AppView::Login;
                                }
                            }
                            KeyCode::Char('S') => app.toggle_story_status().await,
                            KeyCode::Char('T') => app.toggle_theme(),
                            KeyCode::Char('?') => {
                                app.previous_view = Some(app.view);
                                app.view = AppView::Help;
                            }
                            _ => {}
                        },
                        AppView::Reader => match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.close_reader(),
                            KeyCode::Down | KeyCode::Char('j') => match app.prefs.mode {
                                ReadMode::Scroll => app.scroll_down(reader_rows),
                                ReadMode::Pages => app.engine.next_page(),
                            },
                            KeyCode::Up | KeyCode::Char('k') => match app.prefs.mode {
                                ReadMode::Scroll => app.scroll_up(reader_rows),
                                ReadMode::Pages => app.engine.prev_page(),
                            },
                            KeyCode::Right | KeyCode::Char('l') => {
                                if app.prefs.mode == ReadMode::Pages {
                                    app.engine.next_page();
                                }
                            }
                            KeyCode::Left | KeyCode::Char('h') => {
                                if app.prefs.mode == ReadMode::Pages {
                                    app.engine.prev_page();
                                }
                            }
                            KeyCode::Char('n') => app.step_chapter(1).await,
                            KeyCode::Char('p') => app.step_chapter(-1).await,
                            KeyCode::Char('m') => app.update_prefs(|p| p.toggle_mode()),
                            KeyCode::Char('f') => app.update_prefs(|p| p.cycle_font()),
                            KeyCode::Char('+') | KeyCode::Char('=') => {
                                app.update_prefs(|p| p.adjust_size(1))
                            }
                            KeyCode::Char('-') => app.update_prefs(|p| p.adjust_size(-1)),
                            KeyCode::Char('(') => {
                                app.update_prefs(|p| p.adjust_line_height(-0.1))
                            }
                            KeyCode::Char(')') => {
                                app.update_prefs(|p| p.adjust_line_height(0.1))
                            }
                            KeyCode::Char('[') => app.update_prefs(|p| p.adjust_width(-40)),
                            KeyCode::Char(']') => app.update_prefs(|p| p.adjust_width(40)),
                            KeyCode::Char('J') => app.update_prefs(|p| p.toggle_justify()),
                            KeyCode::Char('2') => app.update_prefs(|p| p.toggle_columns()),
                            KeyCode::Char('c') => {
                                app.comment_draft.clear();
                                app.view = AppView::CommentCompose;
                            }
                            KeyCode::Char('T') => app.toggle_theme(),
                            KeyCode::Char('D') => app.toggle_dark(),
                            KeyCode::Char('?') => {
                                app.previous_view = Some(app.view);
                                app.view = AppView::Help;
                            }
                            _ => {}
                        },
                        AppView::CommentCompose => match key.code {
                            KeyCode::Esc => app.view = AppView::Reader,
                            KeyCode::Enter => app.post_comment().await,
                            KeyCode::Char(c) => app.comment_draft.push(c),
                            KeyCode::Backspace => {
                                app.comment_draft.pop();
                            }
                            _ => {}
                        },
                        AppView::Login => match key.code {
                            KeyCode::Esc => app.load_stories().await,
                            KeyCode::Tab => app.login_form.field = (app.login_form.field + 1) % 2,
                            KeyCode::Enter => app.submit_login().await,
                            KeyCode::F(2) => app.view = AppView::Register,
                            KeyCode::Char(c) => match app.login_form.field {
                                0 => app.login_form.username.push(c),
                                _ => app.login_form.password.push(c),
                            },
                            KeyCode::Backspace => {
                                match app.login_form.field {
                                    0 => app.login_form.username.pop(),
                                    _ => app.login_form.password.pop(),
                                };
                            }
                            _ => {}
                        },
                        AppView::Register => match key.code {
                            KeyCode::Esc => app.view = AppView::Login,
                            KeyCode::Tab => {
                                app.register_form.field = (app.register_form.field + 1) % 3
                            }
                            KeyCode::Enter => app.submit_register().await,
                            KeyCode::Char(c) => match app.register_form.field {
                                0 => app.register_form.username.push(c),
                                1 => app.register_form.email.push(c),
                                _ => app.register_form.password.push(c),
                            },
                            KeyCode::Backspace => {
                                match app.register_form.field {
                                    0 => app.register_form.username.pop(),
                                    1 => app.register_form.email.pop(),
                                    _ => app.register_form.password.pop(),
                                };
                            }
                            _ => {}
                        },
                        AppView::StoryForm => match key.code {
                            KeyCode::Esc => {
                                app.view = if app.showing_mine {
                                    AppView::MyStories
                                } else {
                                    AppView::Stories
                                }
                            }
                            KeyCode::Tab => app.story_draft.field = (app.story_draft.field + 1) % 4,
                            KeyCode::Enter => app.submit_story_draft().await,
                            KeyCode::Char(' ') if app.story_draft.field == 3 => {
                                app.story_draft.completed = !app.story_draft.completed
                            }
                            KeyCode::Char(c) => match app.story_draft.field {
                                0 => app.story_draft.title.push(c),
                                1 => app.story_draft.summary.push(c),
                                2 => app.story_draft.tags.push(c),
                                _ => {}
                            },
                            KeyCode::Backspace => {
                                match app.story_draft.field {
                                    0 => app.story_draft.title.pop(),
                                    1 => app.story_draft.summary.pop(),
                                    2 => app.story_draft.tags.pop(),
                                    _ => None,
                                };
                            }
                            _ => {}
                        },
                        AppView::ChapterForm => match key.code {
                            KeyCode::Esc => app.view = AppView::Story,
                            KeyCode::Tab => {
                                app.chapter_draft.field = (app.chapter_draft.field + 1) % 3
                            }
                            KeyCode::Enter => app.submit_chapter_draft().await,
                            KeyCode::Char(c) => match app.chapter_draft.field {
                                0 => app.chapter_draft.title.push(c),
                                1 => app.chapter_draft.content.push(c),
                                _ => {
                                    if let Some(d) = c.to_digit(10) {
                                        app.chapter_draft.position =
                                            app.chapter_draft.position * 10 + d as i64;
                                    }
                                }
                            },
                            KeyCode::Backspace => match app.chapter_draft.field {
                                0 => {
                                    app.chapter_draft.title.pop();
                                }
                                1 => {
                                    app.chapter_draft.content.pop();
                                }
                                _ => app.chapter_draft.position /= 10,
                            },
                            _ => {}
                        },
                        AppView::Help => match key.code {
                            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
                                app.view = app.previous_view.take().unwrap_or(AppView::Stories)
                            }
                            _ => {}
                        },
                    }
                }
                _ => {}
            }
        }

        // Pages mode lays out lazily: after a pref change or a debounced
        // resize, run one pass sized to the current viewport.
        if app.reading.is_some()
            && app.prefs.mode == ReadMode::Pages
            && (app.needs_paginate || app.engine.resize_due())
        {
            let px = app.viewport_px(reader_rows as u16);
            app.repaginate(px);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
