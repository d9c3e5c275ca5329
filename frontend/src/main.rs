use income_tracker_frontend::format::{format_currency, parse_amount, CURRENCY_SYMBOL};
use income_tracker_frontend::models::timestamp;
use income_tracker_frontend::stats::BucketTotals;
use income_tracker_frontend::{use_income_store, IncomeInput, IncomeProvider, RecordId};
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

const INCOME_TYPES: [(&str, &str); 4] = [
    ("salary", "Salary"),
    ("thesis", "Thesis"),
    ("subsidy", "Subsidy"),
    ("other", "Other"),
];

#[derive(Clone, Copy, PartialEq)]
enum StatIcon {
    UpRight,
    Wallet,
    Target,
}

#[derive(Properties, PartialEq)]
struct StatCardProps {
    title: &'static str,
    value: String,
    icon: StatIcon,
}

#[function_component(StatCard)]
fn stat_card(props: &StatCardProps) -> Html {
    html! {
        <div class="bg-card p-6 rounded-[10px] shadow-sm border border-border flex justify-between items-start">
            <div>
                <p class="text-muted-foreground text-[10px] font-bold mb-1 tracking-widest">{ props.title }</p>
                <h3 class="text-2xl font-bold text-[#1D617A] tracking-tight">{ props.value.clone() }</h3>
            </div>
            <div class="p-3 bg-[#eef4f9] rounded-[10px]">
                {
                    match props.icon {
                        StatIcon::UpRight => icon_arrow_up_right(),
                        StatIcon::Wallet => icon_wallet(),
                        StatIcon::Target => icon_target(),
                    }
                }
            </div>
        </div>
    }
}

fn page_shell(title: &'static str, actions: Html, children: Html) -> Html {
    html! {
        <div class="p-6 max-w-7xl mx-auto">
            <div class="flex items-center justify-between pb-4 border-b border-border">
                <h1 class="text-2xl font-bold text-foreground">{ title }</h1>
                { actions }
            </div>
            <div class="pt-5 space-y-6">
                { children }
            </div>
        </div>
    }
}

fn bucket_table(title: &'static str, stats: &BucketTotals) -> Html {
    html! {
        <div class="bg-white rounded-[10px] shadow-sm border border-white/50 overflow-hidden">
            <div class="p-5 border-b border-border">
                <h3 class="font-bold text-lg text-foreground">{ title }</h3>
            </div>
            <table class="w-full text-left border-collapse">
                <tbody class="divide-y divide-border">
                    { if stats.is_empty() {
                        html! { <tr><td colspan="2" class="px-8 py-6 text-center text-muted-foreground">{"No data yet."}</td></tr> }
                    } else {
                        html! {
                            <>
                                { for stats.iter().rev().map(|(key, total)| html! {
                                    <tr key={key.clone()} class="text-sm">
                                        <td class="px-8 py-3 text-muted-foreground">{ key.clone() }</td>
                                        <td class="px-8 py-3 text-right font-semibold text-foreground">{ format_currency(*total, CURRENCY_SYMBOL) }</td>
                                    </tr>
                                }) }
                            </>
                        }
                    }}
                </tbody>
            </table>
        </div>
    }
}

#[function_component(OverviewPage)]
fn overview_page() -> Html {
    let store = use_income_store();

    let form_date = use_state(|| "".to_string());
    let form_amount = use_state(|| "".to_string());
    let form_type = use_state(|| "salary".to_string());
    let form_description = use_state(|| "".to_string());
    let form_error = use_state(|| None::<String>);

    {
        let store = store.clone();
        use_effect_with_deps(
            move |_| {
                if let Some(store) = store {
                    store.load_all();
                }
                || ()
            },
            (),
        );
    }

    let Some(store) = store else {
        return html! {
            <div class="p-6 text-red-500">{"Income store is not available."}</div>
        };
    };
    let state = store.state.clone();

    let on_add = {
        let actions = store.actions.clone();
        let form_date = form_date.clone();
        let form_amount = form_amount.clone();
        let form_type = form_type.clone();
        let form_description = form_description.clone();
        let form_error = form_error.clone();
        Callback::from(move |_| {
            let date_val = form_date.trim().to_string();
            let amt_val = form_amount.trim().to_string();
            let desc_val = form_description.trim().to_string();

            if date_val.is_empty() || amt_val.is_empty() || desc_val.is_empty() {
                form_error.set(Some("Please complete all fields.".to_string()));
                return;
            }
            let Some(date) = timestamp::parse(&date_val) else {
                form_error.set(Some("Please pick a valid date.".to_string()));
                return;
            };
            let Some(amount) = parse_amount(&amt_val) else {
                form_error.set(Some("Amount must be a positive number.".to_string()));
                return;
            };

            form_error.set(None);
            let income = IncomeInput {
                date,
                r#type: (*form_type).clone(),
                amount,
                description: desc_val,
            };

            let actions = actions.clone();
            let form_date = form_date.clone();
            let form_amount = form_amount.clone();
            let form_description = form_description.clone();
            let form_error = form_error.clone();
            spawn_local(async move {
                match actions.add_income(&income).await {
                    Ok(_) => {
                        form_date.set("".to_string());
                        form_amount.set("".to_string());
                        form_description.set("".to_string());
                    }
                    Err(err) => form_error.set(Some(err.to_string())),
                }
            });
        })
    };

    let on_delete = {
        let actions = store.actions.clone();
        Callback::from(move |id: RecordId| {
            let actions = actions.clone();
            spawn_local(async move {
                // the failure is already in the store's error
                let _ = actions.delete_income(&id).await;
            });
        })
    };

    let on_refresh = {
        let store = store.clone();
        Callback::from(move |_| store.load_all())
    };

    let current_goal = state.current_goal().map(|progress| {
        let title = progress
            .goal
            .field("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Current goal")
            .to_string();
        let ratio = progress.metric("progress").unwrap_or(0.0);
        format!("{} · {:.0}%", title, ratio * 100.0)
    });
    let this_month = chrono::Utc::now().format("%Y-%m").to_string();
    let month_total = state.monthly_stats().get(&this_month).copied().unwrap_or(0.0);

    html! {
        { page_shell(
            "Income Overview",
            html! {
                <button onclick={on_refresh} class="bg-[#173E63] text-white px-4 py-2 rounded-[10px] text-[11px] font-bold" disabled={state.loading}>
                    { if state.loading { "Loading..." } else { "Refresh" } }
                </button>
            },
            html! {
                <>
                    {
                        if let Some(msg) = &state.error {
                            html! { <p class="text-sm text-red-500">{ msg.clone() }</p> }
                        } else {
                            html! {}
                        }
                    }
                    <div class="grid grid-cols-1 md:grid-cols-3 gap-4">
                        <StatCard title="TOTAL INCOME" value={format_currency(state.total_income(), CURRENCY_SYMBOL)} icon={StatIcon::Wallet} />
                        <StatCard title="THIS MONTH" value={format_currency(month_total, CURRENCY_SYMBOL)} icon={StatIcon::UpRight} />
                        <StatCard title="CURRENT GOAL" value={current_goal.unwrap_or_else(|| "No goal yet".to_string())} icon={StatIcon::Target} />
                    </div>

                    <div class="bg-white p-5 rounded-[10px] shadow-sm border border-white/50">
                        <h4 class="text-[#1D617A] font-bold text-[15px] mb-3 tracking-wider">{"Add New Income"}</h4>
                        <div class="grid grid-cols-2 md:grid-cols-4 gap-3 mb-4">
                            <input type="date" value={(*form_date).clone()} oninput={{
                                let form_date = form_date.clone();
                                Callback::from(move |e: InputEvent| {
                                    let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                                    form_date.set(input.value());
                                })
                            }} class="w-full bg-[#f1f4f9] rounded-[10px] px-3 py-2 text-[11px] text-[#173E63] border-none" />
                            <input type="number" placeholder={format!("{} 0.00", CURRENCY_SYMBOL)} value={(*form_amount).clone()} oninput={{
                                let form_amount = form_amount.clone();
                                Callback::from(move |e: InputEvent| {
                                    let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                                    form_amount.set(input.value());
                                })
                            }} class="w-full bg-[#f1f4f9] rounded-[10px] px-3 py-2 text-[11px] text-[#173E63] border-none" />
                            <input type="text" placeholder="Income source" value={(*form_description).clone()} oninput={{
                                let form_description = form_description.clone();
                                Callback::from(move |e: InputEvent| {
                                    let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                                    form_description.set(input.value());
                                })
                            }} class="w-full bg-[#f1f4f9] rounded-[10px] px-3 py-2 text-[11px] text-[#173E63] border-none" />
                            <select onchange={{
                                let form_type = form_type.clone();
                                Callback::from(move |e: Event| {
                                    let input: web_sys::HtmlSelectElement = e.target_unchecked_into();
                                    form_type.set(input.value());
                                })
                            }} class="w-full bg-[#f1f4f9] rounded-[10px] px-3 py-2 text-[11px]">
                                { for INCOME_TYPES.iter().map(|(value, label)| html! {
                                    <option value={*value} selected={*form_type == *value}>{ *label }</option>
                                }) }
                            </select>
                        </div>
                        <button onclick={on_add} class="w-full bg-[#173E63] text-white py-2 rounded-[10px] text-[10px] font-bold flex items-center justify-center gap-2" disabled={state.loading}>
                            { icon_plus() }{"Add Income"}
                        </button>
                        {
                            if let Some(msg) = &*form_error {
                                html! { <p class="text-sm text-red-500 mt-3">{ msg.clone() }</p> }
                            } else {
                                html! {}
                            }
                        }
                    </div>

                    <div class="bg-white rounded-[10px] shadow-sm border border-white/50 overflow-hidden">
                        <div class="p-5 border-b border-border">
                            <h3 class="font-bold text-lg text-foreground">{"Income History"}</h3>
                        </div>
                        <table class="w-full text-left border-collapse">
                            <thead>
                                <tr class="bg-muted text-muted-foreground text-[10px] uppercase tracking-widest">
                                    <th class="px-8 py-4 font-bold">{"Date"}</th>
                                    <th class="px-8 py-4 font-bold">{"Description"}</th>
                                    <th class="px-8 py-4 font-bold">{"Type"}</th>
                                    <th class="px-8 py-4 font-bold text-right">{"Amount"}</th>
                                    <th class="px-8 py-4"></th>
                                </tr>
                            </thead>
                            <tbody class="divide-y divide-border">
                                { if state.incomes.is_empty() {
                                    html! { <tr><td colspan="5" class="px-8 py-6 text-center text-muted-foreground">{"No income yet."}</td></tr> }
                                } else {
                                    html! {
                                        <>
                                            { for state.incomes.iter().map(|item| {
                                                let on_delete = on_delete.clone();
                                                let id = item.id.clone();
                                                html! {
                                                    <tr key={item.id.to_string()} class="text-sm hover:bg-muted/40 transition-colors">
                                                        <td class="px-8 py-4 text-muted-foreground">{ item.date.format("%Y-%m-%d").to_string() }</td>
                                                        <td class="px-8 py-4 text-foreground">{ item.description.clone() }</td>
                                                        <td class="px-6 py-4">
                                                            <span class="bg-secondary text-secondary-foreground px-2.5 py-1 rounded-md text-[9px] font-bold">{ item.r#type.clone() }</span>
                                                        </td>
                                                        <td class="px-6 py-4 text-right font-semibold text-foreground">{ format!("+ {}", format_currency(item.amount, CURRENCY_SYMBOL)) }</td>
                                                        <td class="px-6 py-4 text-right">
                                                            <button onclick={Callback::from(move |_| on_delete.emit(id.clone()))} class="text-[10px] font-bold text-red-500">{"Delete"}</button>
                                                        </td>
                                                    </tr>
                                                }
                                            }) }
                                        </>
                                    }
                                }}
                            </tbody>
                        </table>
                    </div>

                    <div class="grid grid-cols-1 lg:grid-cols-2 gap-4">
                        { bucket_table("By Month", &state.monthly_stats()) }
                        { bucket_table("By Day", &state.weekly_stats()) }
                    </div>
                </>
            }
        ) }
    }
}

#[function_component(App)]
fn app() -> Html {
    html! {
        <IncomeProvider>
            <div class="min-h-screen bg-background">
                <OverviewPage />
            </div>
        </IncomeProvider>
    }
}

fn icon_base(path: &'static str) -> Html {
    html! {
        <svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="text-foreground">
            <path d={path}></path>
        </svg>
    }
}

fn icon_wallet() -> Html {
    icon_base("M3 7h18v10H3zM16 7V5H5v2")
}
fn icon_target() -> Html {
    icon_base("M12 12m-9 0a9 9 0 1018 0 9 9 0 10-18 0")
}
fn icon_plus() -> Html {
    icon_base("M12 5v14M5 12h14")
}
fn icon_arrow_up_right() -> Html {
    icon_base("M7 17L17 7M7 7h10v10")
}

fn main() {
    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default();
    yew::Renderer::<App>::new().render();
}
