//! wordflip: 端末で使う単語カード
//!
//! ステージを選ぶとカードがシャッフルされて表示され、めくる・チェックする・
//! 前後に送る・読み上げる、ができる。

pub mod app;
pub mod config;
pub mod gesture;
pub mod logging;
pub mod session;
pub mod speech;
pub mod ui;
pub mod words;
