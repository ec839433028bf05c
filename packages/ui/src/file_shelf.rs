//! Files page body: picker, drop zone, upload progress and the file list.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use store::{
    format_file_size, upload_batch, CancelToken, FileBackend, FileKind, FileShelf, SelectedFile,
    UploadedFile, CHUNK_SIZE,
};

use crate::backend::ApiFiles;
use crate::icons::{
    FaCloudArrowUp, FaDownload, FaFile, FaFileLines, FaFileZipper, FaImage, FaMusic, FaTrash,
    FaVideo,
};
use crate::toast::{show_toast, use_toasts, ToastLevel};
use crate::{now_millis, Icon};

/// Read picked or dropped files into memory. Unreadable files are skipped.
async fn read_selection(files: Vec<FileData>) -> Vec<SelectedFile> {
    let mut selected = Vec::with_capacity(files.len());
    for file in files {
        let name = file.name();
        let content_type = file.content_type().unwrap_or_default();
        match file.read_bytes().await {
            Ok(bytes) => selected.push(SelectedFile::new(name, content_type, bytes.to_vec())),
            Err(e) => tracing::error!("Failed to read {name}: {e}"),
        }
    }
    selected
}

#[component]
pub fn FileShelfView() -> Element {
    let mut shelf = use_signal(FileShelf::new);
    let mut dragging = use_signal(|| false);
    let mut toasts = use_toasts();
    let cancel = use_hook(CancelToken::new);
    use_drop({
        let cancel = cancel.clone();
        move || cancel.cancel()
    });

    let load_cancel = cancel.clone();
    let _loader = use_resource(move || {
        let cancel = load_cancel.clone();
        async move {
            let result = ApiFiles.list_files().await;
            if cancel.is_cancelled() {
                return;
            }
            match result {
                Ok(files) => shelf.write().load(files),
                Err(e) => {
                    tracing::error!("Failed to load files: {e}");
                    shelf.write().load(Vec::new());
                }
            }
        }
    });

    let select = move |files: Vec<FileData>| {
        spawn(async move {
            let selected = read_selection(files).await;
            shelf.write().select(selected);
        });
    };

    let upload_cancel = cancel.clone();
    let on_upload = move |_| {
        let Some(queue) = shelf.write().start_batch(now_millis()) else {
            return;
        };
        let cancel = upload_cancel.clone();
        spawn(async move {
            let report = upload_batch(
                &ApiFiles,
                queue,
                CHUNK_SIZE,
                |key, fraction| {
                    if !cancel.is_cancelled() {
                        shelf.write().record_progress(key, fraction);
                    }
                },
                &cancel,
            )
            .await;
            if cancel.is_cancelled() {
                return;
            }

            shelf.write().finish_batch(&report);
            if report.failed.is_empty() {
                show_toast(&mut toasts, ToastLevel::Success, "Files uploaded successfully");
            } else {
                let message = format!("{} of the files failed to upload", report.failed.len());
                show_toast(&mut toasts, ToastLevel::Error, &message);
            }

            match ApiFiles.list_files().await {
                Ok(files) if !cancel.is_cancelled() => shelf.write().load(files),
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to refresh files: {e}"),
            }
        });
    };

    let delete_cancel = cancel.clone();
    let on_delete = move |id: String| {
        let cancel = delete_cancel.clone();
        spawn(async move {
            let result = ApiFiles.delete_file(&id).await;
            if cancel.is_cancelled() {
                return;
            }
            match result {
                Ok(()) => {
                    shelf.write().remove(&id);
                    show_toast(&mut toasts, ToastLevel::Success, "File deleted");
                }
                Err(e) => {
                    tracing::error!("Failed to delete file: {e}");
                    show_toast(&mut toasts, ToastLevel::Error, "Failed to delete file");
                }
            }
        });
    };

    let state = shelf.read();
    let uploading = state.is_uploading();
    let loaded = state.is_loaded();
    let selected = state.selected().to_vec();
    let files = state.files().to_vec();
    drop(state);

    rsx! {
        div {
            class: "file-shelf",

            div {
                class: if dragging() { "drop-zone dragging" } else { "drop-zone" },
                ondragover: move |evt| {
                    evt.prevent_default();
                    dragging.set(true);
                },
                ondragleave: move |_| dragging.set(false),
                ondrop: move |evt: DragEvent| {
                    evt.prevent_default();
                    dragging.set(false);
                    select(evt.files());
                },
                Icon { icon: FaCloudArrowUp, width: 28, height: 28 }
                p { "Drag files here or choose them" }
                input {
                    r#type: "file",
                    multiple: true,
                    disabled: uploading,
                    onchange: move |evt| select(evt.files()),
                }
            }

            if !selected.is_empty() {
                ul {
                    class: "selected-files",
                    for (index, entry) in selected.into_iter().enumerate() {
                        li {
                            key: "{index}",
                            span { class: "selected-name", "{entry.file.name}" }
                            span { class: "muted", "{format_file_size(entry.file.size())}" }
                            if let Some(fraction) = entry.progress {
                                progress {
                                    max: 100,
                                    value: (fraction * 100.0).round(),
                                }
                                span { class: "muted", "{(fraction * 100.0).round()}%" }
                            }
                        }
                    }
                }
                button {
                    class: "btn btn-primary",
                    disabled: uploading,
                    onclick: on_upload,
                    if uploading { "Uploading..." } else { "Upload" }
                }
            }

            if !loaded {
                p { class: "muted", "Loading files..." }
            } else if files.is_empty() {
                p { class: "muted", "No files uploaded yet." }
            } else {
                ul {
                    class: "file-list",
                    for file in files {
                        FileRow {
                            key: "{file.id}",
                            file: file.clone(),
                            on_delete: on_delete.clone(),
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn FileRow(file: UploadedFile, on_delete: EventHandler<String>) -> Element {
    let id = file.id.clone();
    let uploaded = file.uploaded_at.format("%b %e, %Y %H:%M").to_string();

    rsx! {
        li {
            class: "file-row",
            span {
                class: "file-icon",
                match file.kind() {
                    FileKind::Image => rsx! { Icon { icon: FaImage, width: 16, height: 16 } },
                    FileKind::Video => rsx! { Icon { icon: FaVideo, width: 16, height: 16 } },
                    FileKind::Audio => rsx! { Icon { icon: FaMusic, width: 16, height: 16 } },
                    FileKind::Document => rsx! { Icon { icon: FaFileLines, width: 16, height: 16 } },
                    FileKind::Archive => rsx! { Icon { icon: FaFileZipper, width: 16, height: 16 } },
                    FileKind::Other => rsx! { Icon { icon: FaFile, width: 16, height: 16 } },
                }
            }
            span { class: "file-name", "{file.name}" }
            span { class: "muted", "{format_file_size(file.size)}" }
            span { class: "muted", "{uploaded}" }
            a {
                class: "icon-btn",
                href: "{file.url}",
                target: "_blank",
                rel: "noopener noreferrer",
                title: "Download",
                Icon { icon: FaDownload, width: 12, height: 12 }
            }
            button {
                class: "icon-btn danger",
                title: "Delete",
                onclick: move |_| on_delete.call(id.clone()),
                Icon { icon: FaTrash, width: 12, height: 12 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_and_picker_events_carry_files() {
        fn carries_files<T: HasFileData>() {}
        carries_files::<DragData>();
        carries_files::<FormData>();
    }

    #[test]
    fn test_now_millis_is_after_epoch() {
        assert!(now_millis() > 1_600_000_000_000);
    }
}
