use crate::listing::{DirectorySource, LocalFs};
use crate::picker::DirectoryPicker;
use crate::pipeline::FileListPipeline;
use crate::ui_model::{display_dir, normalize_dir};
use crate::watcher::{DirWatcher, DirectoryWatch};
use eframe::egui;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

pub fn configure_egui_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    if let Some(font_bytes) = load_cjk_font_bytes() {
        let font_name = "cjk_ui".to_string();
        fonts
            .font_data
            .insert(font_name.clone(), egui::FontData::from_owned(font_bytes));
        if let Some(family) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
            family.push(font_name.clone());
        }
        if let Some(family) = fonts.families.get_mut(&egui::FontFamily::Monospace) {
            family.push(font_name);
        }
    }

    ctx.set_fonts(fonts);
}

// File names are shown verbatim, so keep a CJK fallback behind the default fonts.
fn load_cjk_font_bytes() -> Option<Vec<u8>> {
    let mut candidates: Vec<&str> = Vec::new();

    #[cfg(windows)]
    {
        candidates.extend([
            r"C:\Windows\Fonts\msyh.ttc",
            r"C:\Windows\Fonts\YuGothR.ttc",
            r"C:\Windows\Fonts\malgun.ttf",
        ]);
    }

    #[cfg(target_os = "macos")]
    {
        candidates.extend([
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/Hiragino Sans GB.ttc",
            "/System/Library/Fonts/STHeiti Light.ttc",
        ]);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        candidates.extend([
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ]);
    }

    candidates.into_iter().find_map(|path| fs::read(path).ok())
}

pub struct DirScoutApp<S = LocalFs, W = DirWatcher> {
    pipeline: FileListPipeline<S, W>,
    picker: Box<dyn DirectoryPicker>,
    query: String,
    notice: String,
    status_line: String,
    size_labels: HashMap<usize, Option<String>>,
    scroll_to_top: bool,
    focus_query_requested: bool,
}

impl<S: DirectorySource, W: DirectoryWatch> DirScoutApp<S, W> {
    pub fn new(pipeline: FileListPipeline<S, W>, picker: Box<dyn DirectoryPicker>) -> Self {
        let query = pipeline.keyword().to_string();
        let mut app = Self {
            pipeline,
            picker,
            query,
            notice: String::new(),
            status_line: String::new(),
            size_labels: HashMap::new(),
            scroll_to_top: true,
            focus_query_requested: true,
        };
        app.refresh_status_line();
        app
    }

    fn refresh_status_line(&mut self) {
        let notice = if self.notice.is_empty() {
            String::new()
        } else {
            format!(" | {}", self.notice)
        };
        self.status_line = format!("{}{}", self.pipeline.status_text(), notice);
    }

    fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = notice.into();
        self.refresh_status_line();
    }

    /// Every publish reloads all rows; cached size labels belong to the old list.
    fn on_published(&mut self) {
        self.size_labels.clear();
        self.scroll_to_top = true;
        self.refresh_status_line();
    }

    fn poll(&mut self, now: Instant) {
        if self.pipeline.poll(now) {
            self.on_published();
        }
    }

    fn change_directory(&mut self, dir: PathBuf) {
        let dir = normalize_dir(dir);
        if self.pipeline.set_directory(dir) {
            self.on_published();
        }
        self.set_notice(format!(
            "Directory: {}",
            display_dir(self.pipeline.directory())
        ));
    }

    fn choose_directory(&mut self) {
        let start = self.pipeline.directory().to_path_buf();
        match self.picker.pick_directory(&start) {
            Ok(Some(dir)) => self.change_directory(dir),
            Ok(None) => {}
            Err(err) => self.set_notice(format!("Browse failed: {err:#}")),
        }
    }

    fn on_query_edited(&mut self, now: Instant) {
        self.pipeline.set_keyword(&self.query, now);
    }

    fn commit_query(&mut self) {
        if self.pipeline.commit_keyword() {
            self.on_published();
        }
    }

    fn clear_query(&mut self, now: Instant) {
        self.query.clear();
        self.on_query_edited(now);
        self.focus_query_requested = true;
    }

    fn reload(&mut self) {
        if self.pipeline.refresh() {
            self.on_published();
        }
    }

    /// Size label of the row at `index`, cached until the next publish.
    fn size_label_for(&mut self, index: usize) -> Option<String> {
        if let Some(cached) = self.size_labels.get(&index) {
            return cached.clone();
        }
        let label = self
            .pipeline
            .files()
            .get(index)
            .and_then(|entry| self.pipeline.size_label(entry));
        self.size_labels.insert(index, label.clone());
        label
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context, now: Instant) {
        let ctrl_mod = egui::Modifiers {
            ctrl: true,
            ..Default::default()
        };
        if ctx.input_mut(|i| i.consume_key(ctrl_mod, egui::Key::L)) {
            self.focus_query_requested = true;
        }
        if ctx.input_mut(|i| i.consume_key(ctrl_mod, egui::Key::G)) {
            self.clear_query(now);
        }
        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::F5)) {
            self.reload();
        }
    }

    fn show_rows(&mut self, ui: &mut egui::Ui) {
        let row_height = ui.text_style_height(&egui::TextStyle::Body);
        let size_width = 110.0;
        let name_width =
            (ui.available_width() - size_width - ui.spacing().item_spacing.x).max(120.0);

        ui.horizontal(|ui| {
            ui.add_sized(
                [name_width, row_height],
                egui::Label::new(egui::RichText::new("Name").strong()),
            );
            ui.add_sized(
                [size_width, row_height],
                egui::Label::new(egui::RichText::new("Size").strong()),
            );
        });
        ui.separator();

        let mut scroll = egui::ScrollArea::vertical().auto_shrink([false, false]);
        if self.scroll_to_top {
            scroll = scroll.vertical_scroll_offset(0.0);
            self.scroll_to_top = false;
        }
        let total = self.pipeline.files().len();
        scroll.show_rows(ui, row_height, total, |ui, range| {
            for i in range {
                let Some(name) = self.pipeline.files().get(i).map(|e| e.name.clone()) else {
                    continue;
                };
                let label = self.size_label_for(i).unwrap_or_default();
                ui.horizontal(|ui| {
                    ui.add_sized(
                        [name_width, row_height],
                        egui::Label::new(name).truncate(),
                    );
                    ui.add_sized(
                        [size_width, row_height],
                        egui::Label::new(egui::RichText::new(label).color(egui::Color32::GRAY)),
                    );
                });
            }
        });
    }

    fn run_frame(&mut self, ctx: &egui::Context, now: Instant) {
        self.poll(now);
        self.handle_shortcuts(ctx, now);
        self.show_panels(ctx, now);
        // Keystrokes handled by the panels above may have moved the deadline.
        if let Some(deadline) = self.pipeline.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn show_panels(&mut self, ctx: &egui::Context, now: Instant) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Directory:");
                let dir_text = display_dir(self.pipeline.directory());
                let buttons_width = 180.0;
                let field_width = (ui.available_width() - buttons_width).max(120.0);
                ui.add_sized(
                    [field_width, ui.spacing().interact_size.y],
                    egui::Label::new(dir_text).truncate(),
                );
                if ui.button("Choose…").clicked() {
                    self.choose_directory();
                }
                if ui.button("Reload").clicked() {
                    self.reload();
                }
            });

            let query_id = ui.make_persistent_id("query-input");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.query)
                    .id(query_id)
                    .desired_width(f32::INFINITY)
                    .hint_text("Filter by name..."),
            );
            if self.focus_query_requested {
                response.request_focus();
                self.focus_query_requested = false;
            }
            if response.changed() {
                self.on_query_edited(now);
            }
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.commit_query();
                self.focus_query_requested = true;
            }
        });

        egui::TopBottomPanel::bottom("status")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.add(egui::Label::new(&self.status_line).truncate());
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_rows(ui);
        });
    }
}

impl<S, W> eframe::App for DirScoutApp<S, W>
where
    S: DirectorySource + 'static,
    W: DirectoryWatch + 'static,
{
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.run_frame(ctx, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use anyhow::{anyhow, Result};
    use std::path::Path;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn test_root(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("dir-scout-app-{name}-{nonce}"))
    }

    #[derive(Default)]
    struct NullWatch;

    impl DirectoryWatch for NullWatch {
        fn set_target(&mut self, _dir: &Path) -> Result<()> {
            Ok(())
        }

        fn clear(&mut self) {}

        fn poll_changed(&mut self) -> bool {
            false
        }
    }

    enum PickerReply {
        Chosen(PathBuf),
        Cancelled,
        Broken,
    }

    struct ScriptedPicker(PickerReply);

    impl DirectoryPicker for ScriptedPicker {
        fn pick_directory(&self, _start: &Path) -> Result<Option<PathBuf>> {
            match &self.0 {
                PickerReply::Chosen(dir) => Ok(Some(dir.clone())),
                PickerReply::Cancelled => Ok(None),
                PickerReply::Broken => Err(anyhow!("no display")),
            }
        }
    }

    fn app_at(root: &Path, reply: PickerReply) -> DirScoutApp<LocalFs, NullWatch> {
        let pipeline = FileListPipeline::new(
            LocalFs,
            NullWatch,
            root.to_path_buf(),
            "",
            PipelineConfig::default(),
        );
        DirScoutApp::new(pipeline, Box::new(ScriptedPicker(reply)))
    }

    #[test]
    fn status_line_reports_record_count() {
        let root = test_root("status");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("a.txt"), "a").expect("write a");
        fs::write(root.join("b.txt"), "b").expect("write b");

        let app = app_at(&root, PickerReply::Cancelled);
        assert_eq!(app.status_line, "found 2 records");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn choosing_a_directory_switches_listing() {
        let first = test_root("choose-first");
        let second = test_root("choose-second");
        fs::create_dir_all(&first).expect("create first");
        fs::create_dir_all(&second).expect("create second");
        fs::write(second.join("song.mp3"), vec![0u8; 1536]).expect("write song");

        let mut app = app_at(&first, PickerReply::Chosen(second.clone()));
        app.choose_directory();

        assert_eq!(app.pipeline.directory(), second.as_path());
        assert_eq!(app.pipeline.files(), ["song.mp3"]);
        assert_eq!(app.size_label_for(0).as_deref(), Some("1.50 KB"));
        assert!(app.status_line.starts_with("found 1 records"));
        assert!(app.notice.starts_with("Directory:"));
        let _ = fs::remove_dir_all(&first);
        let _ = fs::remove_dir_all(&second);
    }

    #[test]
    fn cancelled_picker_keeps_directory() {
        let root = test_root("cancel");
        fs::create_dir_all(&root).expect("create dir");

        let mut app = app_at(&root, PickerReply::Cancelled);
        app.choose_directory();

        assert_eq!(app.pipeline.directory(), root.as_path());
        assert!(app.notice.is_empty());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn picker_failure_becomes_notice() {
        let root = test_root("broken");
        fs::create_dir_all(&root).expect("create dir");

        let mut app = app_at(&root, PickerReply::Broken);
        app.choose_directory();

        assert!(app.notice.contains("Browse failed: no display"));
        assert_eq!(app.pipeline.directory(), root.as_path());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn typed_query_applies_after_debounce() {
        let root = test_root("query");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("a.txt"), "a").expect("write a");
        fs::write(root.join("b.txt"), "b").expect("write b");

        let mut app = app_at(&root, PickerReply::Cancelled);
        let t0 = Instant::now();
        app.query = "b".to_string();
        app.on_query_edited(t0);
        app.poll(t0 + Duration::from_millis(100));
        assert_eq!(app.pipeline.files().len(), 2);

        app.poll(t0 + Duration::from_millis(500));
        assert_eq!(app.pipeline.files(), ["b.txt"]);
        assert_eq!(app.status_line, "found 1 records");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn clear_query_restores_full_list_and_requests_focus() {
        let root = test_root("clear");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("a.txt"), "a").expect("write a");
        fs::write(root.join("b.txt"), "b").expect("write b");

        let mut app = app_at(&root, PickerReply::Cancelled);
        let t0 = Instant::now();
        app.query = "a".to_string();
        app.on_query_edited(t0);
        app.commit_query();
        assert_eq!(app.pipeline.files(), ["a.txt"]);

        app.focus_query_requested = false;
        app.clear_query(t0);
        app.commit_query();
        assert!(app.query.is_empty());
        assert!(app.focus_query_requested);
        assert_eq!(app.pipeline.files().len(), 2);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn keystroke_frame_schedules_repaint_by_debounce_deadline() {
        let root = test_root("repaint");
        fs::create_dir_all(&root).expect("create dir");
        fs::write(root.join("a.txt"), "a").expect("write a");
        fs::write(root.join("b.txt"), "b").expect("write b");

        let mut app = app_at(&root, PickerReply::Cancelled);
        let ctx = egui::Context::default();
        let t0 = Instant::now();
        let _ = ctx.run(egui::RawInput::default(), |ctx| app.run_frame(ctx, t0));

        let typed = egui::RawInput {
            events: vec![egui::Event::Text("b".to_string())],
            ..Default::default()
        };
        let output = ctx.run(typed, |ctx| app.run_frame(ctx, t0));

        assert_eq!(app.query, "b");
        let debounce = app.pipeline.debounce();
        assert_eq!(app.pipeline.next_deadline(), Some(t0 + debounce));
        let delay = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .map(|viewport| viewport.repaint_delay)
            .expect("root viewport output");
        assert!(delay <= debounce);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn reload_drops_cached_size_labels() {
        let root = test_root("reload");
        fs::create_dir_all(&root).expect("create dir");
        let file = root.join("grow.log");
        fs::write(&file, vec![b'x'; 10]).expect("write small");

        let mut app = app_at(&root, PickerReply::Cancelled);
        assert_eq!(
            app.size_label_for(0).as_deref(),
            Some("10.00 bytes")
        );

        fs::write(&file, vec![b'x'; 2048]).expect("write large");
        assert_eq!(
            app.size_label_for(0).as_deref(),
            Some("10.00 bytes")
        );
        app.reload();
        assert_eq!(app.size_label_for(0).as_deref(), Some("2.00 KB"));
        let _ = fs::remove_dir_all(&root);
    }
}
