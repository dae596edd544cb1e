//! Primitive and slot iteration over type-checked programs.

use std::sync::Arc;
use thingtalk::{
    iterate_primitives, iterate_slots, iterate_slots2, parse_and_typecheck, typecheck_program,
    CheckerOptions, MemorySchemaDelegate, Program, SchemaRetriever, SlotItem,
};

fn retriever() -> SchemaRetriever {
    let delegate = MemorySchemaDelegate::from_json(include_str!("data/schemas.json")).unwrap();
    SchemaRetriever::new(Arc::new(delegate))
}

fn primitives(program: &Program) -> Vec<String> {
    iterate_primitives(program, true)
        .map(|(role, primitive)| format!("{}: {}", role, primitive))
        .collect()
}

fn legacy(program: &Program) -> Vec<String> {
    iterate_slots(program).map(|slot| slot.to_string()).collect()
}

fn slots(program: &Program) -> Vec<String> {
    iterate_slots2(program)
        .map(|item| match item {
            SlotItem::Selector(_) => item.to_string(),
            SlotItem::Value(slot) => {
                let prompt = slot.prompt("en-US").unwrap();
                format!("{} {} {}", slot, slot.tag(), prompt)
            }
        })
        .collect()
}

struct Case {
    code: &'static str,
    primitives: &'static [&'static str],
    legacy: &'static [&'static str],
    slots: &'static [&'static str],
}

const XKCD: &str = "Invocation(Device(com.xkcd, , ), get_comic, , )";
const NOTIFY: &str = "action: Invocation(Builtin, notify, , )";
const SECTION_SLOT: &str = "InputParamSlot(section : Enum(politics,opinions,local,sports,national,world,business,lifestyle)) in_param.section What section do you want to read?";
const TARGET_LANGUAGE_SLOT: &str = "InputParamSlot(target_language : Entity(tt:iso_lang_code)) in_param.target_language What's the target language? Use an ISO language code like it, en or zh.";
const STATUS_SLOT: &str = "InputParamSlot(status : String) in_param.status What do you want to tweet?";
const INSTAGRAM: &str = "query: Invocation(Device(com.instagram, , ), get_pictures, , )";
const INSTAGRAM_LEGACY: &str = "Device(com.instagram, , ) com.instagram:get_pictures";
const WEATHER: &str = "query: Invocation(Device(org.thingpedia.weather, , ), current, , )";
const WEATHER_LEGACY: &str = "Device(org.thingpedia.weather, , ) org.thingpedia.weather:current";
const ARTICLE_LEGACY: &str = "Device(com.washingtonpost, , ) com.washingtonpost:get_article";
const ARTICLE_WORLD: &str = "query: Invocation(Device(com.washingtonpost, , ), get_article, InputParam(section, Enum(world)), )";
const ARTICLE_WORLD_LEGACY: &str = "InputParam(section, Enum(world)) com.washingtonpost:get_article";
const TRANSLATE_ZH: &str = "query: Invocation(Device(com.yandex.translate, , ), translate, InputParam(target_language, Entity(zh, tt:iso_lang_code, )), )";
const TRANSLATE_LEGACY: &str = "Device(com.yandex.translate, , ) com.yandex.translate:translate";
const TRANSLATE_ZH_LEGACY: &str = "InputParam(target_language, Entity(zh, tt:iso_lang_code, )) com.yandex.translate:translate";
const TITLE_SLOT: &str = "FilterSlot(title =~ : String) filter.=~.title What should the title contain?";

const CASES: &[Case] = &[
    Case {
        code: "now => @com.xkcd.get_comic() => notify;",
        primitives: &["query: Invocation(Device(com.xkcd, , ), get_comic, , )", NOTIFY],
        legacy: &["Device(com.xkcd, , ) com.xkcd:get_comic", "Builtin notify"],
        slots: &["Selector(@com.xkcd)"],
    },
    Case {
        code: "monitor (@com.xkcd.get_comic()) => notify;",
        primitives: &["query: Invocation(Device(com.xkcd, , ), get_comic, , )", NOTIFY],
        legacy: &["Device(com.xkcd, , ) com.xkcd:get_comic", "Builtin notify"],
        slots: &["Selector(@com.xkcd)"],
    },
    Case {
        code: "monitor (@com.xkcd.get_comic(number=$undefined)) => notify;",
        primitives: &[
            "query: Invocation(Device(com.xkcd, , ), get_comic, InputParam(number, Undefined(true)), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.xkcd, , ) com.xkcd:get_comic",
            "InputParam(number, Undefined(true)) com.xkcd:get_comic",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.xkcd)",
            "InputParamSlot(number : Number) in_param.number What Xkcd comic do you want?",
        ],
    },
    Case {
        code: "monitor (@com.xkcd.get_comic(number=1234)) => notify;",
        primitives: &[
            "query: Invocation(Device(com.xkcd, , ), get_comic, InputParam(number, Number(1234)), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.xkcd, , ) com.xkcd:get_comic",
            "InputParam(number, Number(1234)) com.xkcd:get_comic",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.xkcd)",
            "InputParamSlot(number : Number) in_param.number What Xkcd comic do you want?",
        ],
    },
    Case {
        code: "monitor (@com.xkcd.get_comic(number=1234)) => @com.facebook.post(status=title);",
        primitives: &[
            "query: Invocation(Device(com.xkcd, , ), get_comic, InputParam(number, Number(1234)), )",
            "action: Invocation(Device(com.facebook, , ), post, InputParam(status, VarRef(title)), )",
        ],
        legacy: &[
            "Device(com.xkcd, , ) com.xkcd:get_comic",
            "InputParam(number, Number(1234)) com.xkcd:get_comic",
            "Device(com.facebook, , ) com.facebook:post",
            "InputParam(status, VarRef(title)) com.facebook:post",
        ],
        slots: &[
            "Selector(@com.xkcd)",
            "InputParamSlot(number : Number) in_param.number What Xkcd comic do you want?",
            "Selector(@com.facebook)",
            "InputParamSlot(status : String) in_param.status What do you want to post?",
        ],
    },
    Case {
        code: "monitor (@com.xkcd.get_comic(number=1234)) => @com.facebook.post(status=$event);",
        primitives: &[
            "query: Invocation(Device(com.xkcd, , ), get_comic, InputParam(number, Number(1234)), )",
            "action: Invocation(Device(com.facebook, , ), post, InputParam(status, Event()), )",
        ],
        legacy: &[
            "Device(com.xkcd, , ) com.xkcd:get_comic",
            "InputParam(number, Number(1234)) com.xkcd:get_comic",
            "Device(com.facebook, , ) com.facebook:post",
            "InputParam(status, Event()) com.facebook:post",
        ],
        slots: &[
            "Selector(@com.xkcd)",
            "InputParamSlot(number : Number) in_param.number What Xkcd comic do you want?",
            "Selector(@com.facebook)",
            "InputParamSlot(status : String) in_param.status What do you want to post?",
        ],
    },
    Case {
        code: "now => aggregate count of @com.xkcd.get_comic(number=1234) => @com.facebook.post(status=$event);",
        primitives: &[
            "query: Invocation(Device(com.xkcd, , ), get_comic, InputParam(number, Number(1234)), )",
            "action: Invocation(Device(com.facebook, , ), post, InputParam(status, Event()), )",
        ],
        legacy: &[
            "Device(com.xkcd, , ) com.xkcd:get_comic",
            "InputParam(number, Number(1234)) com.xkcd:get_comic",
            "Device(com.facebook, , ) com.facebook:post",
            "InputParam(status, Event()) com.facebook:post",
        ],
        slots: &[
            "Selector(@com.xkcd)",
            "InputParamSlot(number : Number) in_param.number What Xkcd comic do you want?",
            "Selector(@com.facebook)",
            "InputParamSlot(status : String) in_param.status What do you want to post?",
        ],
    },
    Case {
        code: "now => aggregate avg temperature of (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location)) => notify;",
        primitives: &[
            "query: Invocation(Device(com.instagram, , ), get_pictures, , )",
            "query: Invocation(Device(org.thingpedia.weather, , ), current, , )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.instagram, , ) com.instagram:get_pictures",
            "Device(org.thingpedia.weather, , ) org.thingpedia.weather:current",
            "Builtin notify",
        ],
        slots: &["Selector(@com.instagram)", "Selector(@org.thingpedia.weather)"],
    },
    Case {
        code: "now => sort temperature asc of (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location)) => notify;",
        primitives: &[INSTAGRAM, WEATHER, NOTIFY],
        legacy: &[INSTAGRAM_LEGACY, WEATHER_LEGACY, "Builtin notify"],
        slots: &["Selector(@com.instagram)", "Selector(@org.thingpedia.weather)"],
    },
    Case {
        code: "now => (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location))[1, 2] => notify;",
        primitives: &[
            "query: Invocation(Device(com.instagram, , ), get_pictures, , )",
            "query: Invocation(Device(org.thingpedia.weather, , ), current, , )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.instagram, , ) com.instagram:get_pictures",
            "Device(org.thingpedia.weather, , ) org.thingpedia.weather:current",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.instagram)",
            "Selector(@org.thingpedia.weather)",
            "ArrayIndexSlot([0] : Number) table.index.0 What is the index of the first result you would like?",
            "ArrayIndexSlot([1] : Number) table.index.1 What is the index of the second result you would like?",
        ],
    },
    Case {
        code: "now => (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location))[1:2] => notify;",
        primitives: &[
            "query: Invocation(Device(com.instagram, , ), get_pictures, , )",
            "query: Invocation(Device(org.thingpedia.weather, , ), current, , )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.instagram, , ) com.instagram:get_pictures",
            "Device(org.thingpedia.weather, , ) org.thingpedia.weather:current",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.instagram)",
            "Selector(@org.thingpedia.weather)",
            "FieldSlot(base : Number) slice.base What is the first result you would like?",
            "FieldSlot(limit : Number) slice.limit How many results would you like?",
        ],
    },
    Case {
        code: "monitor (@com.instagram.get_pictures() join @org.thingpedia.weather.current() on (location=location)) => notify;",
        primitives: &[INSTAGRAM, WEATHER, NOTIFY],
        legacy: &[INSTAGRAM_LEGACY, WEATHER_LEGACY, "Builtin notify"],
        slots: &["Selector(@com.instagram)", "Selector(@org.thingpedia.weather)"],
    },
    Case {
        code: r#"(monitor @com.washingtonpost.get_article() join @com.yandex.translate.translate(target_language="zh"^^tt:iso_lang_code) on (text=title)) => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.washingtonpost, , ), get_article, InputParam(section, Undefined(true)), )",
            "query: Invocation(Device(com.yandex.translate, , ), translate, InputParam(target_language, Entity(zh, tt:iso_lang_code, )), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.washingtonpost, , ) com.washingtonpost:get_article",
            "InputParam(section, Undefined(true)) com.washingtonpost:get_article",
            "Device(com.yandex.translate, , ) com.yandex.translate:translate",
            "InputParam(target_language, Entity(zh, tt:iso_lang_code, )) com.yandex.translate:translate",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            "Selector(@com.yandex.translate)",
            TARGET_LANGUAGE_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.washingtonpost.get_article() join @com.yandex.translate.translate(target_language="zh"^^tt:iso_lang_code) on (text=title) => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.washingtonpost, , ), get_article, InputParam(section, Undefined(true)), )",
            TRANSLATE_ZH,
            NOTIFY,
        ],
        legacy: &[
            ARTICLE_LEGACY,
            "InputParam(section, Undefined(true)) com.washingtonpost:get_article",
            TRANSLATE_LEGACY,
            TRANSLATE_ZH_LEGACY,
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            "Selector(@com.yandex.translate)",
            TARGET_LANGUAGE_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.washingtonpost.get_article(section=enum(world)) join @com.yandex.translate.translate(target_language="zh"^^tt:iso_lang_code) on (text=title) => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.washingtonpost, , ), get_article, InputParam(section, Enum(world)), )",
            TRANSLATE_ZH,
            NOTIFY,
        ],
        legacy: &[
            ARTICLE_LEGACY,
            ARTICLE_WORLD_LEGACY,
            TRANSLATE_LEGACY,
            TRANSLATE_ZH_LEGACY,
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            "Selector(@com.yandex.translate)",
            TARGET_LANGUAGE_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.washingtonpost.get_article(section=enum(world)) => notify;"#,
        primitives: &[ARTICLE_WORLD, NOTIFY],
        legacy: &[
            ARTICLE_LEGACY,
            ARTICLE_WORLD_LEGACY,
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.washingtonpost.get_article(section=enum(world)), title =~ "lol" => notify;"#,
        primitives: &[ARTICLE_WORLD, NOTIFY],
        legacy: &[
            ARTICLE_LEGACY,
            ARTICLE_WORLD_LEGACY,
            "Atom(title, =~, String(lol)) com.washingtonpost:get_article",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            TITLE_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.washingtonpost.get_article(section=enum(world)), title =~ "lol" || title =~ "bar" => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.washingtonpost, , ), get_article, InputParam(section, Enum(world)), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.washingtonpost, , ) com.washingtonpost:get_article",
            "InputParam(section, Enum(world)) com.washingtonpost:get_article",
            "Atom(title, =~, String(lol)) com.washingtonpost:get_article",
            "Atom(title, =~, String(bar)) com.washingtonpost:get_article",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            "FilterSlot(title =~ : String) filter.=~.title What should the title contain?",
            "FilterSlot(title =~ : String) filter.=~.title What should the title contain?",
        ],
    },
    Case {
        code: r#"now @com.washingtonpost.get_article(section=enum(world)), title =~ "lol" => notify;"#,
        primitives: &[ARTICLE_WORLD, NOTIFY],
        legacy: &[
            ARTICLE_LEGACY,
            ARTICLE_WORLD_LEGACY,
            "Atom(title, =~, String(lol)) com.washingtonpost:get_article",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            TITLE_SLOT,
        ],
    },
    Case {
        code: r#"now @com.washingtonpost.get_article(section=enum(world)), title =~ "lol" || title =~ "bar" => notify;"#,
        primitives: &[ARTICLE_WORLD, NOTIFY],
        legacy: &[
            ARTICLE_LEGACY,
            ARTICLE_WORLD_LEGACY,
            "Atom(title, =~, String(lol)) com.washingtonpost:get_article",
            "Atom(title, =~, String(bar)) com.washingtonpost:get_article",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.washingtonpost)",
            SECTION_SLOT,
            TITLE_SLOT,
            TITLE_SLOT,
        ],
    },
    Case {
        code: r#"now => (@com.bing.web_search() join @com.yandex.translate.translate(target_language="it"^^tt:iso_lang_code("Italian")) on (text=$event)) => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.bing, , ), web_search, InputParam(query, Undefined(true)), )",
            "query: Invocation(Device(com.yandex.translate, , ), translate, InputParam(target_language, Entity(it, tt:iso_lang_code, Italian)), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.bing, , ) com.bing:web_search",
            "InputParam(query, Undefined(true)) com.bing:web_search",
            "Device(com.yandex.translate, , ) com.yandex.translate:translate",
            "InputParam(target_language, Entity(it, tt:iso_lang_code, Italian)) com.yandex.translate:translate",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.bing)",
            "InputParamSlot(query : String) in_param.query What do you want to search?",
            "Selector(@com.yandex.translate)",
            TARGET_LANGUAGE_SLOT,
        ],
    },
    Case {
        code: r#"monitor @com.bing.web_search() join @com.yandex.translate.translate(target_language="it"^^tt:iso_lang_code("Italian")) on (text=$event) => notify;"#,
        primitives: &[
            "query: Invocation(Device(com.bing, , ), web_search, InputParam(query, Undefined(true)), )",
            "query: Invocation(Device(com.yandex.translate, , ), translate, InputParam(target_language, Entity(it, tt:iso_lang_code, Italian)), )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.bing, , ) com.bing:web_search",
            "InputParam(query, Undefined(true)) com.bing:web_search",
            TRANSLATE_LEGACY,
            "InputParam(target_language, Entity(it, tt:iso_lang_code, Italian)) com.yandex.translate:translate",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.bing)",
            "InputParamSlot(query : String) in_param.query What do you want to search?",
            "Selector(@com.yandex.translate)",
            TARGET_LANGUAGE_SLOT,
        ],
    },
    Case {
        code: "dataset @com.twitter language 'en' {
            stream (p_author : Entity(tt:username)) := monitor (@com.twitter.search()), author == p_author
            #_[utterances=['monitor ${p_author}\\'s tweets']];
            program := {
                monitor (@com.twitter.search()) => notify;
            }
            #_[utterances=['notify me about new tweets']];
        }",
        primitives: &[
            "query: Invocation(Device(com.twitter, , ), search, , )",
            "query: Invocation(Device(com.twitter, , ), search, , )",
            NOTIFY,
        ],
        legacy: &[
            "Device(com.twitter, , ) com.twitter:search",
            "Atom(author, ==, VarRef(p_author)) com.twitter:search",
            "Device(com.twitter, , ) com.twitter:search",
            "Builtin notify",
        ],
        slots: &[
            "Selector(@com.twitter)",
            "FilterSlot(author == : Entity(tt:username)) filter.==.author From which user do you want tweets?",
            "Selector(@com.twitter)",
        ],
    },
    Case {
        code: "let program p1(p_query : String) := {
            monitor (@com.bing.web_search(query=p_query)) => notify;
        };

        oninput => {
            p1();
        }",
        primitives: &["action: VarRef(p1, InputParam(p_query, Undefined(true)), )"],
        legacy: &["InputParam(p_query, Undefined(true)) p1"],
        slots: &["InputParamSlot(p_query : Any) in_param.p_query Please tell me the query."],
    },
    Case {
        code: "now => result(@com.thecatapi.get) => notify;",
        primitives: &["query: ResultRef(com.thecatapi, get, Number(-1), )", NOTIFY],
        legacy: &["Builtin notify"],
        slots: &["FieldSlot(index : Number) result_ref.index Which result do you want?"],
    },
    Case {
        code: "executor = $? : now => @com.twitter.post();",
        primitives: &["action: Invocation(Device(com.twitter, , ), post, InputParam(status, Undefined(true)), )"],
        legacy: &[
            "Device(com.twitter, , ) com.twitter:post",
            "InputParam(status, Undefined(true)) com.twitter:post",
        ],
        slots: &[
            "FieldSlot(principal : Entity(tt:contact)) program.principal Who should run this command?",
            "Selector(@com.twitter)",
            STATUS_SLOT,
        ],
    },
    Case {
        code: "attimer(time=$?) => @com.twitter.post();",
        primitives: &["action: Invocation(Device(com.twitter, , ), post, InputParam(status, Undefined(true)), )"],
        legacy: &[
            "Device(com.twitter, , ) com.twitter:post",
            "InputParam(status, Undefined(true)) com.twitter:post",
        ],
        slots: &[
            "ArrayIndexSlot([0] : Time) attimer.time.0 When do you want your command to run?",
            "Selector(@com.twitter)",
            STATUS_SLOT,
        ],
    },
    Case {
        code: "attimer(time=[$?, $?]) => @com.twitter.post();",
        primitives: &["action: Invocation(Device(com.twitter, , ), post, InputParam(status, Undefined(true)), )"],
        legacy: &[
            "Device(com.twitter, , ) com.twitter:post",
            "InputParam(status, Undefined(true)) com.twitter:post",
        ],
        slots: &[
            "ArrayIndexSlot([0] : Time) attimer.time.0 What is the first time you would like your command to run?",
            "ArrayIndexSlot([1] : Time) attimer.time.1 What is the second time you would like your command to run?",
            "Selector(@com.twitter)",
            STATUS_SLOT,
        ],
    },
    Case {
        code: "attimer(time=[$?, $?], expiration_date=$?) => @com.twitter.post();",
        primitives: &["action: Invocation(Device(com.twitter, , ), post, InputParam(status, Undefined(true)), )"],
        legacy: &[
            "Device(com.twitter, , ) com.twitter:post",
            "InputParam(status, Undefined(true)) com.twitter:post",
        ],
        slots: &[
            "ArrayIndexSlot([0] : Time) attimer.time.0 What is the first time you would like your command to run?",
            "ArrayIndexSlot([1] : Time) attimer.time.1 What is the second time you would like your command to run?",
            "FieldSlot(expiration_date : Date) attimer.expiration_date When should your command stop?",
            "Selector(@com.twitter)",
            STATUS_SLOT,
        ],
    },
    Case {
        code: "source == $? : now => @com.twitter.post;",
        primitives: &[],
        legacy: &["Atom(source, ==, Undefined(true))"],
        slots: &["FilterSlot(source == : Entity(tt:contact)) filter.==.$source Who is allowed to ask you for this command?"],
    },
    Case {
        code: "in_array(source, $?) : now => @com.twitter.post;",
        primitives: &[],
        legacy: &["Atom(source, in_array, Undefined(true))"],
        slots: &["FilterSlot(source in_array : Array(Entity(tt:contact))) filter.in_array.$source Who is allowed to ask you for this command?"],
    },
    Case {
        code: "in_array(source, [$?, $?]) : now => @com.twitter.post;",
        primitives: &[],
        legacy: &["Atom(source, in_array, Array(Undefined(true),Undefined(true)))"],
        slots: &[
            "FilterSlot(source in_array : Array(Entity(tt:contact))) filter.in_array.$source Who is allowed to ask you for this command?",
            "ArrayIndexSlot([0] : Entity(tt:contact)) filter.in_array.$source.0 Who is the first friend who is allowed to ask you for this command?",
            "ArrayIndexSlot([1] : Entity(tt:contact)) filter.in_array.$source.1 Who is the second friend who is allowed to ask you for this command?",
        ],
    },
    Case {
        code: r#"now => @org.schema.restaurant(), count(review filter { author =~ "bob" }) >= 1 => notify;"#,
        primitives: &["query: Invocation(Device(org.schema, , ), restaurant, , )", NOTIFY],
        legacy: &["Device(org.schema, , ) org.schema:restaurant", "Builtin notify"],
        slots: &[
            "Selector(@org.schema)",
            "FieldSlot(lhs : Number) compute_filter.lhs What is the left hand side of the filter?",
            "FieldSlot(rhs : Number) compute_filter.rhs What is the right hand side of the filter?",
        ],
    },
    Case {
        code: r#"now => @light-bulb(name="bedroom").set_power(power=enum(off));"#,
        primitives: &["action: Invocation(Device(light-bulb, , ), set_power, InputParam(power, Enum(off)), )"],
        legacy: &[
            "Device(light-bulb, , ) light-bulb:set_power",
            "InputParam(power, Enum(off)) light-bulb:set_power",
        ],
        slots: &[
            "DeviceAttributeSlot(name : String) attribute.name Please tell me the name of the device you would like to use.",
            "Selector(@light-bulb)",
            "InputParamSlot(power : Enum(on,off)) in_param.power Do you want to turn it on or off?",
        ],
    },
];

#[tokio::test]
async fn test_iteration_views() {
    let schemas = retriever();
    for (i, case) in CASES.iter().enumerate() {
        let program = parse_and_typecheck(case.code, &schemas, true)
            .await
            .unwrap_or_else(|e| panic!("case {} failed to check: {}", i + 1, e));
        assert_eq!(primitives(&program), case.primitives, "primitives of case {}", i + 1);
        assert_eq!(legacy(&program), case.legacy, "legacy slots of case {}", i + 1);
        assert_eq!(slots(&program), case.slots, "slots of case {}", i + 1);
    }
}

#[tokio::test]
async fn test_queries_can_be_skipped() {
    let program = parse_and_typecheck(
        "monitor (@com.xkcd.get_comic()) => @com.facebook.post(status=title);",
        &retriever(),
        true,
    )
    .await
    .unwrap();
    let roles: Vec<String> = iterate_primitives(&program, false)
        .map(|(role, _)| role.to_string())
        .collect();
    assert_eq!(roles, vec!["action"]);
    assert_eq!(primitives(&program)[0], format!("query: {}", XKCD));
}

#[tokio::test]
async fn test_views_restart() {
    let program = parse_and_typecheck(
        "attimer(time=[$?, $?]) => @com.twitter.post();",
        &retriever(),
        true,
    )
    .await
    .unwrap();
    let first = slots(&program);
    let second = slots(&program);
    assert_eq!(first, second);
    assert_eq!(iterate_slots2(&program).take(1).count(), 1);
}

#[tokio::test]
async fn test_filling_slots_in_order() {
    let mut program = parse_and_typecheck(
        "executor = $? : attimer(time=$?) => @com.twitter.post();",
        &retriever(),
        true,
    )
    .await
    .unwrap();

    let values: Vec<_> = iterate_slots2(&program)
        .filter_map(|item| match item {
            SlotItem::Value(slot) => Some(slot),
            SlotItem::Selector(_) => None,
        })
        .collect();
    assert_eq!(values.len(), 3);
    assert!(values.iter().all(|slot| slot.get().is_undefined()));

    let answers = [
        thingtalk::Value::Entity {
            value: "bob".into(),
            ty: "tt:contact".into(),
            display: None,
        },
        thingtalk::Value::Time { hour: 8, minute: 30 },
        thingtalk::Value::String("good morning".into()),
    ];
    for (mut slot, answer) in values.into_iter().zip(answers) {
        assert!(slot.set(&mut program, answer.clone()));
        assert_eq!(slot.get(), &answer);
    }

    let remaining = iterate_slots2(&program)
        .filter(|item| matches!(item, SlotItem::Value(slot) if slot.get().has_undefined()))
        .count();
    assert_eq!(remaining, 0);
    assert_eq!(
        thingtalk::generate(&program),
        r#"executor = "bob"^^tt:contact : attimer(time=[makeTime(8, 30)]) => @com.twitter.post(status="good morning");"#
    );
}

#[tokio::test]
async fn test_join_right_side_slots_see_enclosing_scope() {
    let schemas = retriever();
    let mut program = parse_and_typecheck(
        "monitor (@com.bing.web_search()) => @com.xkcd.get_comic() join @com.yandex.translate.translate(text=$?) => notify;",
        &schemas,
        true,
    )
    .await
    .unwrap();

    let mut text = iterate_slots2(&program)
        .find_map(|item| match item {
            SlotItem::Value(slot) if slot.tag() == "in_param.text" => Some(slot),
            _ => None,
        })
        .unwrap();
    assert!(text.scope.contains_key("description"));
    assert!(!text.scope.contains_key("alt_text"));
    assert!(!text.scope.contains_key("picture_url"));

    for name in text.scope.keys().cloned().collect::<Vec<_>>() {
        let mut filled = program.clone();
        assert!(text.set(&mut filled, thingtalk::Value::VarRef(name.clone())));
        if text.scope[&name] != thingtalk::Type::String {
            continue;
        }
        typecheck_program(&mut filled, &schemas, &CheckerOptions { allow_undefined: true })
            .await
            .unwrap_or_else(|e| panic!("'{}' was offered but rejected: {}", name, e));
    }

    assert!(text.set(&mut program, thingtalk::Value::VarRef("description".into())));
    typecheck_program(&mut program, &schemas, &CheckerOptions { allow_undefined: true })
        .await
        .unwrap();
}
