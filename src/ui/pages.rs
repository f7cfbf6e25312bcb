use anyhow::Result;
use inquire::{InquireError, Text};
use log::debug;
use std::fmt;

use crate::core::media::MediaFile;
use crate::core::state::Speed;
use crate::services::backend::{ScriptLength, ScriptStyle};
use crate::services::notify::Severity;
use crate::steps::script::ScriptMode;
use crate::steps::{CharacterStep, PreviewStep, ScriptStep, StepContext, UploadStep, VoiceStep};
use crate::ui::{choose, spinner, upload_bar, Nav};
use crate::utils::geometry::{Point, Size};

fn ask(prompt: &str, initial: &str) -> Result<Option<String>> {
    match Text::new(prompt).with_initial_value(initial).prompt() {
        Ok(text) => Ok(Some(text)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Terminals paste dropped files as quoted or escaped paths.
fn clean_dropped_path(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .replace("\\ ", " ")
}

fn parse_point(raw: &str) -> Option<Point> {
    let mut parts = raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    parts.next().is_none().then(|| Point::new(x, y))
}

fn excerpt(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push('…');
    }
    out
}

enum UploadMenu {
    Next,
    Reupload,
    Quit,
}

impl fmt::Display for UploadMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadMenu::Next => "下一步",
            UploadMenu::Reupload => "重新上傳",
            UploadMenu::Quit => "離開",
        })
    }
}

pub async fn upload(view: &mut UploadStep, ctx: &StepContext<'_>) -> Result<Nav> {
    if let Some(media) = view.media() {
        println!("已上傳: {}", media);
        return Ok(
            match choose("影片已就緒", vec![UploadMenu::Next, UploadMenu::Reupload, UploadMenu::Quit])? {
                Some(UploadMenu::Next) => Nav::Next,
                Some(UploadMenu::Reupload) => {
                    view.reupload();
                    Nav::Stay
                }
                Some(UploadMenu::Quit) => Nav::Quit,
                None => Nav::Stay,
            },
        );
    }

    let limit = ctx.config.upload.max_bytes / (1024 * 1024);
    println!("支援 MP4、MOV 格式，檔案大小不超過 {}MB", limit);
    view.set_drag_active(true);
    let raw = match ask("拖放影片到此處或輸入檔案路徑:", "")? {
        Some(raw) => raw,
        None => {
            view.set_drag_active(false);
            return Ok(Nav::Quit);
        }
    };
    view.set_drag_active(false);
    let path = clean_dropped_path(&raw);
    if path.is_empty() {
        return Ok(Nav::Stay);
    }

    let file = match MediaFile::from_path(&path).await {
        Ok(file) => file,
        Err(err) => {
            ctx.notifier.notify(Severity::Error, "無法讀取檔案", &format!("{:#}", err));
            return Ok(Nav::Stay);
        }
    };

    let pb = upload_bar(&file.file_name())?;
    let uploaded = view.submit(ctx, &file, Some(&pb)).await.is_ok();
    if uploaded {
        pb.finish_with_message("上傳完成");
    } else {
        pb.abandon();
    }
    Ok(Nav::Stay)
}

enum CharacterMenu {
    Face(usize),
    Coordinates,
    Next,
    Back,
    Quit,
}

impl fmt::Display for CharacterMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterMenu::Face(number) => write!(f, "點擊角色 {}", number),
            CharacterMenu::Coordinates => f.write_str("輸入點擊座標"),
            CharacterMenu::Next => f.write_str("下一步"),
            CharacterMenu::Back => f.write_str("上一步"),
            CharacterMenu::Quit => f.write_str("離開"),
        }
    }
}

pub async fn character(view: &mut CharacterStep, ctx: &StepContext<'_>, display: Size) -> Result<Nav> {
    if !view.is_loaded() {
        let pb = spinner("偵測影片中的角色...")?;
        let loaded = view.load(ctx).await;
        pb.finish_and_clear();
        if loaded.is_err() {
            return Ok(match choose("偵測失敗", vec![CharacterMenu::Back, CharacterMenu::Quit])? {
                Some(CharacterMenu::Quit) => Nav::Quit,
                Some(_) => Nav::Back,
                None => Nav::Stay,
            });
        }
    }

    if let Some(frame) = view.frame() {
        debug!("Source frame {}x{}", frame.width, frame.height);
    }
    println!("點擊影片中的人物以選擇要進行口型同步的角色 (畫面 {}x{})", display.width, display.height);
    let overlay = view.overlay(display);
    for item in &overlay {
        let r = item.region;
        println!(
            "  {} [{}] ({:.0}, {:.0}) {:.0}x{:.0}",
            if item.selected { "●" } else { "○" },
            item.number,
            r.x,
            r.y,
            r.width,
            r.height
        );
    }
    if overlay.is_empty() {
        println!("  (未偵測到角色)");
    }

    let mut options: Vec<CharacterMenu> = overlay.iter().map(|b| CharacterMenu::Face(b.number)).collect();
    options.extend([
        CharacterMenu::Coordinates,
        CharacterMenu::Next,
        CharacterMenu::Back,
        CharacterMenu::Quit,
    ]);

    Ok(match choose("選擇角色", options)? {
        Some(CharacterMenu::Face(number)) => {
            if let Some(item) = overlay.iter().find(|b| b.number == number) {
                view.click(item.region.center(), display);
            }
            Nav::Stay
        }
        Some(CharacterMenu::Coordinates) => {
            if let Some(raw) = ask("點擊位置 (x, y):", "")? {
                match parse_point(&raw) {
                    Some(p) => {
                        view.click(p, display);
                    }
                    None => println!("無法解析座標: {}", raw),
                }
            }
            Nav::Stay
        }
        Some(CharacterMenu::Next) => Nav::Next,
        Some(CharacterMenu::Back) | None => Nav::Back,
        Some(CharacterMenu::Quit) => Nav::Quit,
    })
}

enum ScriptMenu {
    SwitchMode,
    Theme,
    Keywords,
    Style,
    Length,
    Generate,
    Edit,
    Next,
    Back,
    Quit,
}

impl fmt::Display for ScriptMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptMenu::SwitchMode => "切換 AI 生成 / 自訂文案",
            ScriptMenu::Theme => "影片主題",
            ScriptMenu::Keywords => "關鍵字 (選填)",
            ScriptMenu::Style => "文案風格",
            ScriptMenu::Length => "文案長度",
            ScriptMenu::Generate => "生成文案",
            ScriptMenu::Edit => "編輯文案",
            ScriptMenu::Next => "下一步",
            ScriptMenu::Back => "上一步",
            ScriptMenu::Quit => "離開",
        })
    }
}

pub async fn script(view: &mut ScriptStep, ctx: &StepContext<'_>) -> Result<Nav> {
    let options = match view.mode() {
        ScriptMode::Generate => {
            println!(
                "AI 生成 | 主題: {} | 關鍵字: {} | 風格: {} | 長度: {}",
                view.theme(),
                view.keywords(),
                view.style(),
                view.length()
            );
            vec![
                ScriptMenu::Theme,
                ScriptMenu::Keywords,
                ScriptMenu::Style,
                ScriptMenu::Length,
                ScriptMenu::Generate,
                ScriptMenu::Edit,
                ScriptMenu::SwitchMode,
                ScriptMenu::Next,
                ScriptMenu::Back,
                ScriptMenu::Quit,
            ]
        }
        ScriptMode::Custom => {
            println!("自訂文案");
            vec![
                ScriptMenu::Edit,
                ScriptMenu::SwitchMode,
                ScriptMenu::Next,
                ScriptMenu::Back,
                ScriptMenu::Quit,
            ]
        }
    };
    if !view.active_text().is_empty() {
        println!("---\n{}\n---", view.active_text());
    }

    Ok(match choose("文案", options)? {
        Some(ScriptMenu::SwitchMode) => {
            view.set_mode(match view.mode() {
                ScriptMode::Generate => ScriptMode::Custom,
                ScriptMode::Custom => ScriptMode::Generate,
            });
            Nav::Stay
        }
        Some(ScriptMenu::Theme) => {
            if let Some(theme) = ask("影片主題:", view.theme())? {
                view.set_theme(theme);
            }
            Nav::Stay
        }
        Some(ScriptMenu::Keywords) => {
            if let Some(keywords) = ask("關鍵字:", view.keywords())? {
                view.set_keywords(keywords);
            }
            Nav::Stay
        }
        Some(ScriptMenu::Style) => {
            if let Some(style) = choose("文案風格:", ScriptStyle::ALL.to_vec())? {
                view.set_style(style);
            }
            Nav::Stay
        }
        Some(ScriptMenu::Length) => {
            if let Some(length) = choose("文案長度:", ScriptLength::ALL.to_vec())? {
                view.set_length(length);
            }
            Nav::Stay
        }
        Some(ScriptMenu::Generate) => {
            if let Ok(request) = view.begin_generate(ctx) {
                let pb = spinner("生成中...")?;
                let result = ctx.backend.generate_script(&request).await;
                pb.finish_and_clear();
                if let Err(err) = view.finish_generate(ctx, result) {
                    debug!("Script generation failed: {}", err);
                }
            }
            Nav::Stay
        }
        Some(ScriptMenu::Edit) => {
            if let Some(text) = ask("文案內容:", view.active_text())? {
                match view.mode() {
                    ScriptMode::Generate => view.edit_generated(text),
                    ScriptMode::Custom => view.set_custom(text),
                }
            }
            Nav::Stay
        }
        Some(ScriptMenu::Next) => Nav::Next,
        Some(ScriptMenu::Back) | None => Nav::Back,
        Some(ScriptMenu::Quit) => Nav::Quit,
    })
}

enum VoiceMenu {
    Select,
    Sample,
    Speed,
    Next,
    Back,
    Quit,
}

impl fmt::Display for VoiceMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VoiceMenu::Select => "選擇語音",
            VoiceMenu::Sample => "試聽 / 停止",
            VoiceMenu::Speed => "語速",
            VoiceMenu::Next => "下一步",
            VoiceMenu::Back => "上一步",
            VoiceMenu::Quit => "離開",
        })
    }
}

/// A catalog entry as listed in a menu.
struct VoiceItem {
    id: String,
    text: String,
}

impl fmt::Display for VoiceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn voice_items(view: &VoiceStep) -> Vec<VoiceItem> {
    view.catalog()
        .iter()
        .map(|v| VoiceItem {
            id: v.id.clone(),
            text: format!("{} [{}]", v.name, v.gender.label()),
        })
        .collect()
}

pub fn voice(view: &mut VoiceStep) -> Result<Nav> {
    let selected = view.selected().map(|v| v.id.clone());
    let playing = view.playing().map(str::to_string);
    for v in view.catalog() {
        let mark = if selected.as_deref() == Some(v.id.as_str()) { "●" } else { "○" };
        let sound = if playing.as_deref() == Some(v.id.as_str()) { "  ♪ 播放中" } else { "" };
        println!("  {} {} [{}]{}", mark, v.name, v.gender.label(), sound);
    }
    println!("語速: {}", view.speed());

    let options = vec![
        VoiceMenu::Select,
        VoiceMenu::Sample,
        VoiceMenu::Speed,
        VoiceMenu::Next,
        VoiceMenu::Back,
        VoiceMenu::Quit,
    ];
    Ok(match choose("語音", options)? {
        Some(VoiceMenu::Select) => {
            if let Some(item) = choose("選擇語音:", voice_items(view))? {
                view.select(&item.id);
            }
            Nav::Stay
        }
        Some(VoiceMenu::Sample) => {
            if let Some(item) = choose("試聽:", voice_items(view))? {
                view.toggle_sample(&item.id);
            }
            Nav::Stay
        }
        Some(VoiceMenu::Speed) => {
            if let Some(speed) = choose("語速:", Speed::all().collect::<Vec<_>>())? {
                view.set_speed(speed);
            }
            Nav::Stay
        }
        Some(VoiceMenu::Next) => Nav::Next,
        Some(VoiceMenu::Back) | None => Nav::Back,
        Some(VoiceMenu::Quit) => Nav::Quit,
    })
}

enum PreviewMenu {
    Subtitles(bool),
    Process,
    Download,
    Finish,
    Back,
    Quit,
}

impl fmt::Display for PreviewMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewMenu::Subtitles(on) => write!(f, "字幕: {}", if *on { "開" } else { "關" }),
            PreviewMenu::Process => f.write_str("開始處理"),
            PreviewMenu::Download => f.write_str("下載影片"),
            PreviewMenu::Finish => f.write_str("完成"),
            PreviewMenu::Back => f.write_str("上一步"),
            PreviewMenu::Quit => f.write_str("離開"),
        }
    }
}

pub fn preview(view: &mut PreviewStep) -> Result<Nav> {
    println!("語音: {} ({})", view.voice().display_name, view.voice().speed);
    println!("文案: {}", excerpt(view.script(), 60));
    if let Some(output) = view.output() {
        println!("輸出: {} ({})", output.id, output.media);
    }

    let mut options = vec![PreviewMenu::Subtitles(view.subtitles())];
    if view.can_process() {
        options.push(PreviewMenu::Process);
    }
    if view.can_finish() {
        options.extend([PreviewMenu::Download, PreviewMenu::Finish]);
    }
    options.extend([PreviewMenu::Back, PreviewMenu::Quit]);

    Ok(match choose("預覽與輸出", options)? {
        Some(PreviewMenu::Subtitles(on)) => {
            view.set_subtitles(!on);
            Nav::Stay
        }
        Some(PreviewMenu::Process) => Nav::Process,
        Some(PreviewMenu::Download) => Nav::Download,
        Some(PreviewMenu::Finish) => Nav::Finish,
        Some(PreviewMenu::Back) | None => Nav::Back,
        Some(PreviewMenu::Quit) => Nav::Quit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_paths_are_unquoted() {
        assert_eq!(clean_dropped_path("  '/tmp/my clip.mp4' "), "/tmp/my clip.mp4");
        assert_eq!(clean_dropped_path("/tmp/my\\ clip.mov\n"), "/tmp/my clip.mov");
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("125, 75"), Some(Point::new(125.0, 75.0)));
        assert_eq!(parse_point("125 75.5"), Some(Point::new(125.0, 75.5)));
        assert_eq!(parse_point("125"), None);
        assert_eq!(parse_point("1,2,3"), None);
        assert_eq!(parse_point("a,b"), None);
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("隆重推出", 10), "隆重推出");
        assert_eq!(excerpt("隆重推出", 2), "隆重…");
    }
}
