use dioxus::prelude::*;
use ui::NoteBoard;

#[component]
pub fn Notes() -> Element {
    rsx! {
        section {
            class: "page",
            h1 { "Notes" }
            NoteBoard {}
        }
    }
}
