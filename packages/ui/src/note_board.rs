//! Notes page body: the draft/edit form and the note list.

use dioxus::prelude::*;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use store::editor::{Submission, SubmitOutcome};
use store::{CancelToken, Note, NoteBackend, NoteEditor, NoteFormat};

use crate::backend::ApiNotes;
use crate::icons::{FaPen, FaTrash};
use crate::Icon;

/// URL schemes that run code when a link or image is followed.
const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let lowered: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Render Markdown note content to HTML.
///
/// Notes are shared between users, so raw HTML in the source is shown as
/// text and script URLs in links and images are dropped.
pub fn render_markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            other => other,
        });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[component]
pub fn NoteBoard() -> Element {
    let mut editor = use_signal(|| NoteEditor::new(NoteFormat::default()));
    let mut loading = use_signal(|| true);
    let cancel = use_hook(CancelToken::new);
    use_drop({
        let cancel = cancel.clone();
        move || cancel.cancel()
    });

    // Fetch the format and all notes once on mount
    let load_cancel = cancel.clone();
    let _loader = use_resource(move || {
        let cancel = load_cancel.clone();
        async move {
            let format = match api::client_settings().await {
                Ok(settings) => settings.note_format,
                Err(e) => {
                    tracing::error!("Failed to load settings: {e}");
                    NoteFormat::default()
                }
            };
            let result = ApiNotes.list_notes().await;
            if cancel.is_cancelled() {
                return;
            }
            // Keep whatever the user typed while the fetch was in flight
            let mut state = editor.write();
            state.set_format(format);
            match result {
                Ok(notes) => state.load(notes),
                Err(e) => tracing::error!("Failed to load notes: {e}"),
            }
            drop(state);
            loading.set(false);
        }
    });

    let submit_cancel = cancel.clone();
    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let Some(submission) = editor.write().take_submission() else {
            return;
        };
        let cancel = submit_cancel.clone();
        spawn(async move {
            let result = match submission {
                Submission::Create(draft) => ApiNotes.create_note(draft).await.map(SubmitOutcome::Created),
                Submission::Update { id, patch } => ApiNotes
                    .update_note(&id, patch)
                    .await
                    .map(SubmitOutcome::Updated),
            };
            if cancel.is_cancelled() {
                return;
            }
            match result {
                Ok(SubmitOutcome::Created(note)) => editor.write().finish_create(note),
                Ok(SubmitOutcome::Updated(note)) => editor.write().finish_update(note),
                Ok(SubmitOutcome::Skipped) => {}
                Err(e) => {
                    tracing::error!("Failed to save note: {e}");
                    editor.write().fail_submission();
                }
            }
        });
    };

    let delete_cancel = cancel.clone();
    let on_delete = move |id: String| {
        let cancel = delete_cancel.clone();
        spawn(async move {
            let result = ApiNotes.delete_note(&id).await;
            if cancel.is_cancelled() {
                return;
            }
            match result {
                Ok(()) => editor.write().remove(&id),
                Err(e) => tracing::error!("Failed to delete note: {e}"),
            }
        });
    };

    let state = editor.read();
    let format = state.format();
    let editing = state.is_editing();
    let submitting = state.is_submitting();
    let title = state.title().to_string();
    let content = state.content().to_string();
    let notes: Vec<Note> = state.notes().to_vec();
    drop(state);

    rsx! {
        div {
            class: "note-board",

            form {
                class: "note-form",
                onsubmit: onsubmit,
                input {
                    class: "note-title-input",
                    r#type: "text",
                    placeholder: "Title",
                    value: "{title}",
                    oninput: move |evt| editor.write().set_title(evt.value()),
                }
                textarea {
                    class: "note-content-input",
                    rows: 6,
                    placeholder: if format == NoteFormat::Rich { "Write in Markdown..." } else { "Content" },
                    value: "{content}",
                    oninput: move |evt| editor.write().set_content(evt.value()),
                }
                if format == NoteFormat::Rich && !content.trim().is_empty() {
                    div {
                        class: "note-preview",
                        dangerous_inner_html: render_markdown(&content),
                    }
                }
                div {
                    class: "note-form-actions",
                    button {
                        r#type: "submit",
                        class: "btn btn-primary",
                        disabled: submitting,
                        if editing { "Update Note" } else { "Add Note" }
                    }
                    if editing {
                        button {
                            r#type: "button",
                            class: "btn",
                            onclick: move |_| editor.write().cancel_edit(),
                            "Cancel"
                        }
                    }
                }
            }

            if loading() {
                p { class: "muted", "Loading notes..." }
            } else if notes.is_empty() {
                p { class: "muted", "No notes yet." }
            } else {
                ul {
                    class: "note-list",
                    for note in notes {
                        NoteCard {
                            key: "{note.id}",
                            note: note.clone(),
                            format,
                            on_edit: move |id: String| {
                                editor.write().begin_edit(&id);
                            },
                            on_delete: on_delete.clone(),
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn NoteCard(
    note: Note,
    format: NoteFormat,
    on_edit: EventHandler<String>,
    on_delete: EventHandler<String>,
) -> Element {
    let edit_id = note.id.clone();
    let delete_id = note.id.clone();

    rsx! {
        li {
            class: "note-card",
            h3 { class: "note-card-title", "{note.title}" }
            match format {
                NoteFormat::Rich => rsx! {
                    div {
                        class: "note-card-content",
                        dangerous_inner_html: render_markdown(&note.content),
                    }
                },
                NoteFormat::Plain => rsx! {
                    p { class: "note-card-content", "{note.content}" }
                },
            }
            div {
                class: "note-card-actions",
                button {
                    class: "icon-btn",
                    title: "Edit",
                    onclick: move |_| on_edit.call(edit_id.clone()),
                    Icon { icon: FaPen, width: 12, height: 12 }
                }
                button {
                    class: "icon-btn danger",
                    title: "Delete",
                    onclick: move |_| on_delete.call(delete_id.clone()),
                    Icon { icon: FaTrash, width: 12, height: 12 }
                }
            }
        }
    }
}
