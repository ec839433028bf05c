use dioxus::prelude::*;
use ui::FileShelfView;

#[component]
pub fn Files() -> Element {
    rsx! {
        section {
            class: "page",
            h1 { "Files" }
            FileShelfView {}
        }
    }
}
