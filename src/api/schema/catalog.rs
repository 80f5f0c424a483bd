//! Hand-authored command catalog, grouped the way the remote presents it.

use super::{ApiCategoryDef, ApiCommandDef, CommandParam, ParamType};
use indexmap::IndexMap;
use ParamType::{Any, Boolean, Number, String as Str};

fn req(kind: ParamType) -> CommandParam {
    CommandParam::required(kind)
}

fn opt(kind: ParamType) -> CommandParam {
    CommandParam::optional(kind)
}

fn one_of(values: &[&str]) -> ParamType {
    ParamType::Enum(values.iter().map(|v| v.to_string()).collect())
}

fn command(id: &str, label: &str, params: Vec<(&str, CommandParam)>) -> ApiCommandDef {
    let params = if params.is_empty() {
        None
    } else {
        Some(
            params
                .into_iter()
                .map(|(name, param)| (name.to_string(), param))
                .collect::<IndexMap<_, _>>(),
        )
    };
    ApiCommandDef {
        id: id.to_string(),
        label: label.to_string(),
        params,
    }
}

fn category(id: &str, icon: &str, commands: Vec<ApiCommandDef>) -> ApiCategoryDef {
    ApiCategoryDef {
        id: id.to_string(),
        label: id.to_string(),
        icon: Some(icon.to_string()),
        commands,
    }
}

// path/index/data triple shared by media, audio and thumbnail commands
fn media_params() -> Vec<(&'static str, CommandParam)> {
    vec![("path", req(Str)), ("index", opt(Number)), ("data", opt(Any))]
}

pub(super) fn builtin_categories() -> Vec<ApiCategoryDef> {
    vec![
        category(
            "PROJECT",
            "albums-outline",
            vec![
                command("id_select_project", "Select Project by ID", vec![("id", req(Str))]),
                command(
                    "index_select_project",
                    "Select Project by Index",
                    vec![("index", req(Number))],
                ),
                command("name_select_project", "Select Project by Name", vec![("value", req(Str))]),
                command("next_project_item", "Next Project Item", vec![]),
                command("previous_project_item", "Previous Project Item", vec![]),
                command(
                    "index_select_project_item",
                    "Select Project Item Index",
                    vec![("index", req(Number))],
                ),
            ],
        ),
        category(
            "SHOWS",
            "easel-outline",
            vec![
                command("name_select_show", "Select Show by Name", vec![("value", req(Str))]),
                command("start_show", "Start Show", vec![("id", req(Str))]),
                command(
                    "change_layout",
                    "Change Layout",
                    vec![("showId", opt(Str)), ("layoutId", req(Str))],
                ),
                command(
                    "set_plain_text",
                    "Set Plain Text",
                    vec![("id", req(Str)), ("value", req(Str))],
                ),
                command("set_show", "Set Show", vec![("id", req(Str)), ("value", req(Str))]),
                command(
                    "rearrange_groups",
                    "Rearrange Groups",
                    vec![("showId", req(Str)), ("from", req(Number)), ("to", req(Number))],
                ),
                command(
                    "add_group",
                    "Add Group",
                    vec![("showId", req(Str)), ("groupId", req(Str))],
                ),
                command("set_template", "Set Template", vec![("id", req(Str))]),
            ],
        ),
        category(
            "PRESENTATION",
            "play-circle-outline",
            vec![
                command("next_slide", "Next Slide", vec![]),
                command("previous_slide", "Previous Slide", vec![]),
                command("random_slide", "Random Slide", vec![]),
                command(
                    "index_select_slide",
                    "Select Slide by Index",
                    vec![("index", req(Number)), ("showId", opt(Str)), ("layoutId", opt(Str))],
                ),
                command("name_select_slide", "Select Slide by Name", vec![("value", req(Str))]),
                command("id_select_group", "Select Group by ID", vec![("id", req(Str))]),
                command("start_slide_recording", "Start Slide Recording", vec![]),
            ],
        ),
        category(
            "CLEAR",
            "trash-outline",
            vec![
                command("restore_output", "Restore Output", vec![]),
                command("clear_all", "Clear All", vec![]),
                command("clear_background", "Clear Background", vec![]),
                command("clear_slide", "Clear Slide", vec![]),
                command("clear_overlays", "Clear Overlays", vec![]),
                command("clear_audio", "Clear Audio", vec![]),
                command("clear_next_timer", "Clear Next Timer", vec![]),
                command("clear_drawing", "Clear Drawing", vec![]),
            ],
        ),
        category(
            "MEDIA",
            "film-outline",
            vec![
                command(
                    "start_camera",
                    "Start Camera",
                    vec![("id", req(Str)), ("name", opt(Str)), ("groupId", opt(Str))],
                ),
                command(
                    "start_screen",
                    "Start Screen",
                    vec![("id", req(Str)), ("name", opt(Str))],
                ),
                command("play_media", "Play Media", media_params()),
            ],
        ),
        category(
            "OVERLAYS",
            "layers-outline",
            vec![
                command(
                    "index_select_overlay",
                    "Select Overlay Index",
                    vec![("index", req(Number))],
                ),
                command("name_select_overlay", "Select Overlay Name", vec![("value", req(Str))]),
                command("id_select_overlay", "Select Overlay by ID", vec![("id", req(Str))]),
                command(
                    "start_scripture",
                    "Start Scripture",
                    vec![("id", req(Str)), ("reference", req(Str))],
                ),
                command("scripture_next", "Scripture Next", vec![]),
                command("scripture_previous", "Scripture Previous", vec![]),
                command("lock_output", "Lock Output", vec![("value", opt(Boolean))]),
                command("toggle_output_windows", "Toggle Output Windows", vec![]),
                command("toggle_output", "Toggle Output", vec![("id", req(Str))]),
            ],
        ),
        category(
            "VISUAL",
            "color-palette-outline",
            vec![
                command(
                    "id_select_output_style",
                    "Select Output Style by ID",
                    vec![("id", req(Str))],
                ),
                command(
                    "change_output_style",
                    "Change Output Style",
                    vec![("outputStyle", opt(Str)), ("styleOutputs", opt(Any))],
                ),
                command(
                    "change_stage_output_layout",
                    "Change Stage Output Layout",
                    vec![("outputId", opt(Str)), ("stageLayoutId", req(Str))],
                ),
                command(
                    "change_transition",
                    "Change Transition",
                    vec![
                        ("id", opt(one_of(&["text", "media"]))),
                        ("type", opt(Str)),
                        ("duration", opt(Number)),
                        ("easing", opt(Str)),
                    ],
                ),
            ],
        ),
        category(
            "STAGE",
            "tv-outline",
            vec![
                command(
                    "id_select_stage_layout",
                    "Select Stage Layout by ID",
                    vec![("id", req(Str))],
                ),
                command("play_audio", "Play Audio", media_params()),
                command("pause_audio", "Pause Audio", media_params()),
                command("stop_audio", "Stop Audio", media_params()),
            ],
        ),
        category(
            "AUDIO",
            "volume-high-outline",
            vec![
                command(
                    "change_volume",
                    "Change Volume",
                    vec![("volume", opt(Number)), ("gain", opt(Number))],
                ),
                command("start_audio_stream", "Start Audio Stream", vec![("id", req(Str))]),
                command("start_playlist", "Start Playlist", vec![("id", req(Str))]),
                command("playlist_next", "Playlist Next", vec![]),
                command(
                    "start_metronome",
                    "Start Metronome",
                    vec![
                        ("tempo", opt(Number)),
                        ("beats", opt(Number)),
                        ("volume", opt(Number)),
                        ("audioOutput", opt(Str)),
                    ],
                ),
            ],
        ),
        category(
            "TIMERS",
            "time-outline",
            vec![
                command("name_start_timer", "Start Timer by Name", vec![("value", req(Str))]),
                command("id_start_timer", "Start Timer by ID", vec![("id", req(Str))]),
                command(
                    "start_slide_timers",
                    "Start Slide Timers",
                    vec![("showId", opt(Str)), ("slideId", opt(Str))],
                ),
                command("pause_timers", "Pause Timers", vec![]),
                command("stop_timers", "Stop Timers", vec![]),
                command(
                    "edit_timer",
                    "Edit Timer",
                    vec![("id", req(Str)), ("key", req(Str)), ("value", req(Any))],
                ),
            ],
        ),
        category(
            "FUNCTIONS",
            "construct-outline",
            vec![
                command(
                    "change_variable",
                    "Change Variable",
                    vec![
                        ("id", opt(Str)),
                        ("name", opt(Str)),
                        ("index", opt(Number)),
                        (
                            "key",
                            opt(one_of(&[
                                "text",
                                "number",
                                "random_number",
                                "value",
                                "enabled",
                                "step",
                                "name",
                                "type",
                                "increment",
                                "decrement",
                                "randomize",
                                "reset",
                            ])),
                        ),
                        ("value", opt(Any)),
                        ("variableAction", opt(one_of(&["increment", "decrement"]))),
                    ],
                ),
                command("start_trigger", "Start Trigger", vec![("id", req(Str))]),
            ],
        ),
        category(
            "OTHER",
            "ellipsis-horizontal-outline",
            vec![
                command("sync_drive", "Sync Drive", vec![]),
                command("sync_pco", "Sync PCO", vec![]),
                command(
                    "send_rest_command",
                    "Send REST Command",
                    vec![
                        ("url", req(Str)),
                        ("method", req(Str)),
                        ("contentType", req(Str)),
                        ("payload", req(Str)),
                    ],
                ),
                command(
                    "emit_action",
                    "Emit Action",
                    vec![
                        ("emitter", req(Str)),
                        ("template", opt(Str)),
                        ("templateValues", opt(Any)),
                    ],
                ),
            ],
        ),
        category(
            "ACTION",
            "flash-outline",
            vec![
                command("name_run_action", "Run Action by Name", vec![("value", req(Str))]),
                command("run_action", "Run Action by ID", vec![("id", req(Str))]),
                command(
                    "toggle_action",
                    "Toggle Action",
                    vec![("id", req(Str)), ("value", opt(Boolean))],
                ),
            ],
        ),
        category(
            "EDIT",
            "create-outline",
            vec![
                command(
                    "add_to_project",
                    "Add to Project",
                    vec![("projectId", req(Str)), ("id", req(Str)), ("data", opt(Any))],
                ),
                command(
                    "create_show",
                    "Create Show",
                    vec![("text", req(Str)), ("name", opt(Str)), ("category", opt(Str))],
                ),
            ],
        ),
        category(
            "GET",
            "download-outline",
            vec![
                command("get_shows", "Get Shows", vec![]),
                command("get_show", "Get Show", vec![("id", req(Str))]),
                command("get_show_layout", "Get Show Layout", vec![("id", req(Str))]),
                command("get_projects", "Get Projects", vec![]),
                command("get_project", "Get Project", vec![("id", req(Str))]),
                command("get_plain_text", "Get Plain Text", vec![("id", req(Str))]),
                command("get_groups", "Get Groups", vec![("id", req(Str))]),
                command("get_output", "Get Output", vec![("id", opt(Str))]),
                command("get_output_slide_text", "Get Output Slide Text", vec![]),
                command("get_output_group_name", "Get Output Group Name", vec![]),
                command(
                    "get_dynamic_value",
                    "Get Dynamic Value",
                    vec![("value", req(Str)), ("ref", opt(Any))],
                ),
                command("get_playing_video_duration", "Get Playing Video Duration", vec![]),
                command("get_playing_video_time", "Get Playing Video Time", vec![]),
                command("get_playing_video_time_left", "Get Playing Video Time Left", vec![]),
                command("get_playing_audio_duration", "Get Playing Audio Duration", vec![]),
                command("get_playing_audio_time", "Get Playing Audio Time", vec![]),
                command("get_playing_audio_time_left", "Get Playing Audio Time Left", vec![]),
                command("get_playing_audio_data", "Get Playing Audio Data", vec![]),
                command("get_playlists", "Get Playlists", vec![]),
                command("get_playlist", "Get Playlist", vec![("id", opt(Str))]),
                command(
                    "get_slide",
                    "Get Slide",
                    vec![("showId", opt(Str)), ("slideId", opt(Str))],
                ),
                command("get_thumbnail", "Get Thumbnail", media_params()),
                command(
                    "get_slide_thumbnail",
                    "Get Slide Thumbnail",
                    vec![("showId", opt(Str)), ("layoutId", opt(Str)), ("index", opt(Number))],
                ),
                command("get_pdf_thumbnails", "Get PDF Thumbnails", media_params()),
                command("get_cleared", "Get Cleared", vec![]),
            ],
        ),
    ]
}
