use crate::api::HttpClient;
use crate::config::ApiConfig;
use crate::store::{Actions, IncomeState};
use std::rc::Rc;
use yew::prelude::*;

pub type IncomeActions = Actions<HttpClient, UseReducerDispatcher<IncomeState>>;

/// What components get from [`use_income_store`]: the current state and the
/// actions that change it.
#[derive(Clone)]
pub struct IncomeContext {
    pub state: UseReducerHandle<IncomeState>,
    pub actions: Rc<IncomeActions>,
}

impl PartialEq for IncomeContext {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && Rc::ptr_eq(&self.actions, &other.actions)
    }
}

impl IncomeContext {
    /// Initial load of both collections.
    pub fn load_all(&self) {
        let actions = self.actions.clone();
        wasm_bindgen_futures::spawn_local(async move {
            actions.fetch_incomes().await;
            // already recorded in the state
            let _ = actions.fetch_goals().await;
        });
    }
}

#[derive(Properties, PartialEq)]
pub struct IncomeProviderProps {
    #[prop_or_default]
    pub config: ApiConfig,
    pub children: Children,
}

#[function_component(IncomeProvider)]
pub fn income_provider(props: &IncomeProviderProps) -> Html {
    let state = use_reducer(IncomeState::default);
    let actions = {
        let dispatcher = state.dispatcher();
        use_memo(
            move |config| Actions::new(HttpClient::new(config.clone()), dispatcher),
            props.config.clone(),
        )
    };

    use_effect_with_deps(
        move |config| {
            let client = HttpClient::new(config.clone());
            wasm_bindgen_futures::spawn_local(async move {
                match client.health().await {
                    Ok(message) => tracing::info!(
                        %message,
                        base_url = %client.config().base_url,
                        "income API reachable"
                    ),
                    Err(error) => tracing::warn!(error = %error, "income API unreachable"),
                }
            });
            || ()
        },
        props.config.clone(),
    );

    let context = IncomeContext { state, actions };

    html! {
        <ContextProvider<IncomeContext> context={context}>
            { for props.children.iter() }
        </ContextProvider<IncomeContext>>
    }
}

#[hook]
pub fn use_income_store() -> Option<IncomeContext> {
    use_context::<IncomeContext>()
}
